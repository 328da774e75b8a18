//! End-to-end pipeline tests over generated CSV tables

use std::fs;
use std::path::{Path, PathBuf};
use tabpipe::error::PipelineError;
use tabpipe::pipeline::{run, PipelineConfig};
use tempfile::TempDir;

/// 100 training rows: 60 "no" / 40 "yes", numerically separable, with
/// scattered blanks in both a numeric and a categorical column
fn write_train_csv(path: &Path) {
    let cities = ["NYC", "LA", "SF"];
    let mut csv = String::from("age,income,city,Target\n");
    for i in 0..100usize {
        let (base_age, base_income, label) = if i < 60 {
            (25 + (i % 10), 30_000 + (i % 10) * 500, "no")
        } else {
            (55 + (i % 10), 90_000 + (i % 10) * 500, "yes")
        };
        let age = if i % 17 == 0 {
            String::new()
        } else {
            base_age.to_string()
        };
        let city = if i % 13 == 0 { "" } else { cities[i % 3] };
        csv.push_str(&format!("{},{},{},{}\n", age, base_income, city, label));
    }
    fs::write(path, csv).unwrap();
}

/// 20 test rows with the same feature columns and no target
fn write_test_csv(path: &Path) {
    let cities = ["NYC", "LA", "SF"];
    let mut csv = String::from("age,income,city\n");
    for i in 0..20usize {
        let (age, income) = if i < 12 {
            (25 + (i % 10), 30_000 + (i % 10) * 500)
        } else {
            (55 + (i % 10), 90_000 + (i % 10) * 500)
        };
        csv.push_str(&format!("{},{},{}\n", age, income, cities[i % 3]));
    }
    fs::write(path, csv).unwrap();
}

fn config_for(dir: &TempDir, output_name: &str) -> PipelineConfig {
    let train = dir.path().join("train.csv");
    let test = dir.path().join("test.csv");
    write_train_csv(&train);
    write_test_csv(&test);
    PipelineConfig {
        train_path: train,
        test_path: test,
        output_path: dir.path().join(output_name),
        ..PipelineConfig::default()
    }
}

#[test]
fn test_full_run_writes_submission() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir, "submission.csv");

    let report = run(&config).unwrap();

    assert_eq!(report.n_train_rows, 100);
    assert_eq!(report.n_test_rows, 20);
    assert_eq!(report.baselines.len(), 4);
    assert_eq!(report.search.trials.len(), 16);

    // Separable data: the tuned forest should validate well
    assert!(
        report.tuned.accuracy >= 0.8,
        "tuned accuracy {}",
        report.tuned.accuracy
    );

    let text = fs::read_to_string(&config.output_path).unwrap();
    let lines: Vec<&str> = text.trim().lines().collect();
    assert_eq!(lines.len(), 21);
    assert_eq!(lines[0], "ID,Target");

    for (row, line) in lines[1..].iter().enumerate() {
        let mut fields = line.split(',');
        let id: usize = fields.next().unwrap().parse().unwrap();
        let target = fields.next().unwrap();
        assert_eq!(id, row);
        assert!(
            target == "no" || target == "yes",
            "row {} predicted {:?}",
            row,
            target
        );
    }
}

#[test]
fn test_runs_are_deterministic() {
    let dir = TempDir::new().unwrap();
    let config_a = config_for(&dir, "a.csv");
    let config_b = PipelineConfig {
        output_path: dir.path().join("b.csv"),
        ..config_a.clone()
    };

    let report_a = run(&config_a).unwrap();
    let report_b = run(&config_b).unwrap();

    assert_eq!(
        fs::read_to_string(&config_a.output_path).unwrap(),
        fs::read_to_string(&config_b.output_path).unwrap()
    );
    assert_eq!(report_a.search.best_params, report_b.search.best_params);
    for (a, b) in report_a.baselines.iter().zip(report_b.baselines.iter()) {
        assert_eq!(a.report.accuracy, b.report.accuracy);
    }
}

#[test]
fn test_unseen_test_category_fails_the_run() {
    let dir = TempDir::new().unwrap();
    let mut config = config_for(&dir, "submission.csv");

    let test = dir.path().join("test_unseen.csv");
    fs::write(&test, "age,income,city\n30,40000,Tokyo\n60,95000,NYC\n").unwrap();
    config.test_path = test;

    match run(&config) {
        Err(PipelineError::UnseenCategory { column, value }) => {
            assert_eq!(column, "city");
            assert_eq!(value, "Tokyo");
        }
        other => panic!("expected UnseenCategory, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_missing_target_column_fails_early() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir, "submission.csv");
    let config = PipelineConfig {
        target_column: "Label".to_string(),
        ..config
    };

    assert!(matches!(
        run(&config),
        Err(PipelineError::ColumnNotFound(col)) if col == "Label"
    ));
}

#[test]
fn test_missing_input_file_fails() {
    let dir = TempDir::new().unwrap();
    let config = PipelineConfig {
        train_path: PathBuf::from(dir.path().join("nope.csv")),
        ..PipelineConfig::default()
    };
    assert!(matches!(run(&config), Err(PipelineError::DataError(_))));
}
