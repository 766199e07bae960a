use ensemble_service::{
    config::{EnsembleConfig, LoaderConfig},
    services::{
        blending::BlendingWeight,
        ensemble::DiversityWeight,
        loader::CacheDirSource,
        output::{load_manifest, ResultsWriter},
        similarity::SimilarityMeasure,
    },
    EnsembleError, EnsembleService, Loader,
};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

fn write_result(dir: &Path, owner: &str, repo: &str, commit: &str, score: u32, body: &str) {
    let name = format!("results.{owner}.{repo}.{commit}.{score}.txt");
    fs::write(dir.join(name), body).expect("write fixture");
}

fn fixture() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = dir.path().join("results");
    fs::create_dir_all(&cache).expect("cache dir");

    write_result(&cache, "alice", "recs", "a1", 900, "1:10,11,12\n2:20,21\n");
    // Older commit of the same repo, filtered out by top_n_commits_per_repo
    write_result(&cache, "alice", "recs", "a0", 800, "1:10\n2:20\n");
    write_result(&cache, "bob", "engine", "b1", 850, "1:10,11,13\n2:20,22\n");
    write_result(&cache, "carol", "knn", "c1", 700, "1:30,31\n2:40\n");
    write_result(&cache, "dave", "lucky", "d1", 600, "1:10,30\n3:50\n");
    fs::write(dir.path().join("test.txt"), "1\n2\n3\n4\n").expect("manifest");

    dir
}

#[tokio::test]
async fn test_full_pipeline_over_cache_dir() {
    let dir = fixture();
    let source = CacheDirSource::new(dir.path().join("results"));
    let loader = Loader::new(LoaderConfig::default());

    let pool = EnsembleService::load_pool(&loader, &source)
        .await
        .expect("pool loads");
    assert_eq!(pool.len(), 4);
    assert_eq!(pool.entries()[0].id().owner, "alice");
    assert_eq!(pool.entries()[0].id().commit, "a1");

    let users = load_manifest(&dir.path().join("test.txt")).expect("manifest");
    let base = dir.path().join("out").join("results");
    let writer = ResultsWriter::new(users, &base.to_string_lossy());
    let config = EnsembleConfig {
        size: 2,
        similarity_measure: SimilarityMeasure::Jaccard,
        diversity_weight: DiversityWeight::Score,
        blending_weight: BlendingWeight::Equal,
        repo_recommendations_per_user: 3,
        save_intermediate_results: true,
        ..Default::default()
    };
    let service = EnsembleService::new(config, writer.clone()).expect("valid config");

    let outcome = service.run(pool).expect("run succeeds");

    // carol shares nothing with alice, so her 700 beats bob's discounted 850
    let owners: Vec<_> = outcome
        .ensemble
        .members()
        .iter()
        .map(|m| m.id().owner.clone())
        .collect();
    assert_eq!(owners, vec!["alice", "carol"]);
    assert_eq!(outcome.shortfall, 0);

    let written = fs::read_to_string(writer.final_path()).expect("final results");
    let lines: Vec<_> = written.lines().collect();
    assert_eq!(lines, vec!["1:10,11,12", "2:20,21,40", "3:", "4:"]);
    assert!(writer.intermediate_path(2).exists());
}

#[tokio::test]
async fn test_weighted_jaccard_pipeline_without_replacement() {
    let dir = fixture();
    let source = CacheDirSource::new(dir.path().join("results"));
    let loader = Loader::new(LoaderConfig {
        top_n_commits_per_repo: None,
        ..Default::default()
    });

    let pool = EnsembleService::load_pool(&loader, &source)
        .await
        .expect("pool loads");
    assert_eq!(pool.len(), 5);

    let base = dir.path().join("weighted");
    let writer = ResultsWriter::new(vec!["1".to_string()], &base.to_string_lossy());
    let config = EnsembleConfig {
        size: 4,
        similarity_measure: SimilarityMeasure::InversePopularityWeightedJaccard,
        save_intermediate_results: false,
        ..Default::default()
    };
    let service = EnsembleService::new(config, writer).expect("valid config");

    let outcome = service.run(pool).expect("run succeeds");

    let repos: HashSet<_> = outcome
        .ensemble
        .members()
        .iter()
        .map(|m| m.id().repo_key())
        .collect();
    assert_eq!(repos.len(), outcome.ensemble.len());
    assert_eq!(outcome.ensemble.len(), 4);
}

#[tokio::test]
async fn test_pool_too_small_is_rejected() {
    let dir = fixture();
    let source = CacheDirSource::new(dir.path().join("results"));
    let loader = Loader::new(LoaderConfig::default());
    let pool = EnsembleService::load_pool(&loader, &source)
        .await
        .expect("pool loads");

    let writer = ResultsWriter::new(Vec::new(), &dir.path().join("x").to_string_lossy());
    let config = EnsembleConfig {
        size: 4,
        ..Default::default()
    };
    let service = EnsembleService::new(config, writer).expect("valid config");

    let result = service.run(pool);
    assert!(matches!(
        result,
        Err(EnsembleError::InsufficientPool {
            available: 4,
            required: 4
        })
    ));
}
