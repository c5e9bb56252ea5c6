use calories_predictor::bundle::PredictionBundle;
use calories_predictor::contract::FeatureContract;
use calories_predictor::dataset::Table;
use calories_predictor::inference::{InferenceRecord, Predictor};
use calories_predictor::model::{Hyperparameters, ModelKind, RandomForestConfig};
use calories_predictor::prepare::prepare;
use calories_predictor::trainer::Trainer;
use calories_predictor::{CaloriesError, FieldValue};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

const N_ROWS: usize = 100;

struct Row {
    user_id: usize,
    age: f64,
    height: f64,
    gender: &'static str,
    heart_rate: f64,
    body_temp: f64,
    weight: f64,
    duration: f64,
    calories: f64,
}

fn synthetic_rows() -> Vec<Row> {
    (0..N_ROWS)
        .map(|i| {
            let heart_rate = 80.0 + ((i * 7) % 50) as f64;
            let body_temp = 38.0 + (i % 30) as f64 * 0.1;
            let noise = ((i * 37) % 11) as f64 - 5.0;
            Row {
                user_id: 1000 + i,
                age: 20.0 + (i % 50) as f64,
                height: 150.0 + (i % 40) as f64,
                gender: if i % 2 == 0 { "male" } else { "female" },
                heart_rate,
                body_temp,
                weight: 50.0 + (i % 30) as f64,
                duration: 5.0 + (i % 25) as f64,
                calories: 10.0 * heart_rate - 5.0 * body_temp + noise,
            }
        })
        .collect()
}

fn write_single_csv(path: &Path) {
    let mut csv = String::from(
        "User_ID,Age,Height,Gender,Heart_Rate,Body_Temp,Weight,Duration,Calories\n",
    );
    for r in synthetic_rows() {
        csv.push_str(&format!(
            "{},{},{},{},{},{},{},{},{}\n",
            r.user_id,
            r.age,
            r.height,
            r.gender,
            r.heart_rate,
            r.body_temp,
            r.weight,
            r.duration,
            r.calories
        ));
    }
    fs::write(path, csv).unwrap();
}

/// Target and features in two files, exercise rows in reverse order.
fn write_split_csvs(calories: &Path, exercise: &Path) {
    let rows = synthetic_rows();
    let mut target = String::from("User_ID,Calories\n");
    for r in &rows {
        target.push_str(&format!("{},{}\n", r.user_id, r.calories));
    }
    let mut features =
        String::from("User_ID,Gender,Age,Height,Weight,Duration,Heart_Rate,Body_Temp\n");
    for r in rows.iter().rev() {
        features.push_str(&format!(
            "{},{},{},{},{},{},{},{}\n",
            r.user_id, r.gender, r.age, r.height, r.weight, r.duration, r.heart_rate, r.body_temp
        ));
    }
    fs::write(calories, target).unwrap();
    fs::write(exercise, features).unwrap();
}

fn small_forest() -> Trainer {
    Trainer::builder()
        .model(ModelKind::RandomForest)
        .hyperparameters(Hyperparameters {
            random_forest: RandomForestConfig {
                n_estimators: 20,
                ..RandomForestConfig::default()
            },
            ..Hyperparameters::default()
        })
        .verbose(false)
        .build()
}

fn request() -> InferenceRecord {
    InferenceRecord {
        age: 35.0,
        gender: FieldValue::Text("female".to_string()),
        height: 170.0,
        weight: Some(70.0),
        duration: Some(12.0),
        heart_rate: 105.0,
        body_temp: 39.5,
    }
}

#[test]
fn test_train_save_load_predict() {
    let dir = tempdir().unwrap();
    let csv_path = dir.path().join("calories.csv");
    write_single_csv(&csv_path);

    let table = Table::from_csv_path(&csv_path).unwrap();
    let data = prepare(&table, &FeatureContract::calories()).unwrap();
    assert_eq!(
        data.ordered_fields,
        vec!["Age", "Height", "Gender", "Heart_Rate", "Body_Temp"]
    );

    let report = small_forest().fit(&data).unwrap();
    assert_eq!(report.n_train + report.n_validation, N_ROWS);
    assert_eq!(report.n_validation, 10);
    assert!(report.mae() < 50.0, "validation MAE too high: {}", report.mae());

    let bundle_path = dir.path().join("ml-api").join("calories_model.bin");
    report.bundle.save(&bundle_path).unwrap();
    let loaded = PredictionBundle::load(&bundle_path).unwrap();
    assert_eq!(loaded.ordered_fields(), report.bundle.ordered_fields());

    let predictor = Predictor::new(Arc::new(loaded));
    let first = predictor.predict(&request()).unwrap();
    let second = predictor.predict(&request()).unwrap();
    assert_eq!(first, second);
    // 10 * 105 - 5 * 39.5, within the noise of a small forest
    assert!((first.calories - 852.5).abs() < 60.0, "{}", first.calories);

    let in_memory = Predictor::new(Arc::new(report.bundle));
    assert_eq!(in_memory.predict(&request()).unwrap(), first);
}

#[test]
fn test_two_file_join_keeps_exercise_column_order() {
    let dir = tempdir().unwrap();
    let calories_path = dir.path().join("calories.csv");
    let exercise_path = dir.path().join("exercise.csv");
    write_split_csvs(&calories_path, &exercise_path);

    let contract = FeatureContract::calories();
    let calories = Table::from_csv_path(&calories_path).unwrap();
    let exercise = Table::from_csv_path(&exercise_path).unwrap();
    let joined = calories.inner_join(&exercise, contract.join_key()).unwrap();
    assert_eq!(joined.n_rows(), N_ROWS);

    let data = prepare(&joined, &contract).unwrap();
    assert_eq!(
        data.ordered_fields,
        vec!["Gender", "Age", "Height", "Heart_Rate", "Body_Temp"]
    );

    let report = small_forest().fit(&data).unwrap();
    assert!(report.mae() < 50.0, "validation MAE too high: {}", report.mae());

    let predictor = Predictor::new(Arc::new(report.bundle));
    assert!(predictor.predict(&request()).is_ok());
}

#[test]
fn test_same_seed_gives_same_bundle_bytes() {
    let dir = tempdir().unwrap();
    let csv_path = dir.path().join("calories.csv");
    write_single_csv(&csv_path);
    let data = prepare(
        &Table::from_csv_path(&csv_path).unwrap(),
        &FeatureContract::calories(),
    )
    .unwrap();

    let a = small_forest().fit(&data).unwrap();
    let b = small_forest().fit(&data).unwrap();
    assert_eq!(a.mae(), b.mae());
    assert_eq!(a.bundle.to_bytes().unwrap(), b.bundle.to_bytes().unwrap());
}

#[test]
fn test_missing_target_column_is_schema_error() {
    let table = Table::from_csv_reader(
        "User_ID,Age,Height,Gender,Heart_Rate,Body_Temp\n1,30,170,male,90,39\n".as_bytes(),
    )
    .unwrap();
    match prepare(&table, &FeatureContract::calories()) {
        Err(CaloriesError::Schema { missing, .. }) => {
            assert_eq!(missing, vec!["Calories".to_string()])
        }
        other => panic!("expected schema error, got {:?}", other),
    }
}

#[test]
fn test_out_of_range_request_rejected_after_reload() {
    let dir = tempdir().unwrap();
    let csv_path = dir.path().join("calories.csv");
    write_single_csv(&csv_path);
    let data = prepare(
        &Table::from_csv_path(&csv_path).unwrap(),
        &FeatureContract::calories(),
    )
    .unwrap();
    let report = small_forest().fit(&data).unwrap();
    let bundle = PredictionBundle::from_bytes(&report.bundle.to_bytes().unwrap()).unwrap();
    let predictor = Predictor::new(Arc::new(bundle));

    let too_hot = InferenceRecord {
        body_temp: 45.5,
        ..request()
    };
    assert!(matches!(
        predictor.predict(&too_hot),
        Err(CaloriesError::Validation { .. })
    ));
}
