use cinesearch_core::builder::{IndexBuilder, IndexOrigin};
use cinesearch_core::evaluate::{build_ground_truth, default_scenarios, load_ground_truth, save_ground_truth, Evaluator};
use cinesearch_core::persist::{load_index, load_meta, IndexPaths, SNAPSHOT_VERSION};
use cinesearch_core::service::SearchService;
use cinesearch_core::store::{RecordStore, SledStore};
use cinesearch_core::{FieldWeights, LexicalRanker, Normalizer, Ranker, SearchConfig, VectorRanker};
use std::fs;
use tempfile::tempdir;

const RECORDS: &str = r#"
{"id":1,"title":"Hạ cánh nơi anh","genre":"Tình cảm, Hài","country":"Hàn Quốc","year":2019,"rating":9.0}
{"id":2,"title":"Mai","genre":"Tâm lý, Tình cảm","country":"Việt Nam","year":2024,"rating":8.1}
{"id":3,"title":"Lật mặt 7","genre":"Gia đình, Tâm lý","country":"Việt Nam","year":2024}
{"id":4,"title":"Parasite","original_title":"Gisaengchung","genre":"Tâm lý, Hình sự","country":"Hàn Quốc","year":2019,"rating":8.6}
{"id":5,"title":"Tee Yod","genre":"Kinh dị","country":"Thái Lan","year":2023}
"#;

fn seeded_store(dir: &std::path::Path) -> SledStore {
    let input = dir.join("movies.jsonl");
    fs::write(&input, RECORDS.trim_start()).unwrap();
    let store = SledStore::open(dir.join("db")).unwrap();
    assert_eq!(store.import_jsonl(&input).unwrap(), 5);
    store
}

#[test]
fn build_save_and_restore_index() {
    let dir = tempdir().unwrap();
    let store = seeded_store(dir.path());
    let builder = IndexBuilder::new(Normalizer::default(), FieldWeights::default(), IndexPaths::new(dir.path().join("index")));

    let (built, origin) = builder.load_or_build(&store).unwrap();
    assert_eq!(origin, IndexOrigin::FreshBuild);
    let meta = load_meta(builder.paths()).unwrap();
    assert_eq!(meta.num_docs, 5);
    assert_eq!(meta.version, SNAPSHOT_VERSION);

    let restored = load_index(builder.paths()).unwrap();
    assert_eq!(restored, built);

    let vector = VectorRanker::new(restored, Normalizer::default());
    let hits = vector.rank("kinh dị", 3).unwrap();
    assert_eq!(hits.first().map(|h| h.0), Some(5));
}

#[test]
fn ground_truth_and_lexical_evaluation() {
    let dir = tempdir().unwrap();
    let store = seeded_store(dir.path());

    let truth = build_ground_truth(&store, &default_scenarios()).unwrap();
    assert_eq!(truth["Hàn Quốc"].iter().copied().collect::<Vec<_>>(), vec![1, 4]);
    assert_eq!(truth["2024"].iter().copied().collect::<Vec<_>>(), vec![2, 3]);
    assert!(!truth.contains_key("Võ thuật"));

    let path = dir.path().join("ground_truth.json");
    save_ground_truth(&path, &truth).unwrap();
    assert!(fs::read_to_string(&path).unwrap().contains("\"Hàn Quốc\""));
    assert_eq!(load_ground_truth(&path).unwrap(), truth);

    let evaluator = Evaluator::new(LexicalRanker::new(&store), truth);
    let m = evaluator.metrics("Hàn Quốc", 10).unwrap().unwrap();
    assert_eq!(m.precision, 1.0);
    assert_eq!(m.recall, 1.0);
    assert_eq!(m.average_precision, 1.0);

    let report = evaluator.evaluate(10).unwrap();
    assert!(report.queries.windows(2).all(|w| w[0].query < w[1].query));
    assert!(report.mean_average_precision > 0.0 && report.mean_average_precision <= 1.0);
}

#[test]
fn service_over_sled() {
    let dir = tempdir().unwrap();
    let store = seeded_store(dir.path());
    assert_eq!(store.scan().unwrap().len(), 5);
    let svc = SearchService::new(store, SearchConfig::default());

    let page = svc.search("tâm lý", 1);
    assert_eq!(page.total, 3);
    // equal scores, newest first, then ascending id
    let ids: Vec<u32> = page.items.iter().map(|r| r.document.id).collect();
    assert_eq!(ids, vec![2, 3, 4]);

    let popular: Vec<u32> = svc.popular(12).iter().map(|d| d.id).collect();
    assert_eq!(popular, vec![1, 4, 2]);
    assert_eq!(svc.by_genre("kinh dị", 10).len(), 1);
    assert_eq!(svc.get(4).unwrap().original_title.as_deref(), Some("Gisaengchung"));
}
