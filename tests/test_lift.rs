//! Integration test: scored test set → deviance → lift tables → Gini ranking

use boosting_insights::lift::{poisson_deviance_with_exposure, LiftConfig};
use boosting_insights::prelude::*;
use ndarray::array;
use polars::prelude::*;

/// Eight policies with a GLM and a GBM pure premium
fn scored_policies() -> DataFrame {
    df!(
        "expo" => &[1.0, 0.5, 1.0, 0.25, 1.0, 0.75, 1.0, 0.5],
        "amount" => &[0.0, 120.0, 0.0, 0.0, 800.0, 0.0, 60.0, 0.0],
        "glm" => &[100.0, 80.0, 120.0, 60.0, 150.0, 90.0, 110.0, 70.0],
        "gbm" => &[90.0, 100.0, 100.0, 50.0, 210.0, 80.0, 130.0, 70.0]
    )
    .unwrap()
}

fn load_from_csv(frame: &mut DataFrame) -> (tempfile::TempDir, Dataset) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test_set.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    CsvWriter::new(&mut file).include_header(true).finish(frame).unwrap();
    let data = DataLoader::new().load_auto(&path).unwrap();
    (dir, data)
}

// ============================================================================
// Deviance
// ============================================================================

#[test]
fn test_poisson_deviance_values() {
    let d = poisson_deviance(&array![0.0, 2.0], &array![1.0, 2.0]).unwrap();
    assert!((d - 1.0).abs() < 1e-12);

    let counts = array![0.0, 1.0, 0.0, 2.0, 0.0];
    let close = poisson_deviance(&counts, &array![0.1, 0.9, 0.2, 1.8, 0.1]).unwrap();
    let flat = poisson_deviance(&counts, &array![0.6, 0.6, 0.6, 0.6, 0.6]).unwrap();
    assert!(close < flat);
}

#[test]
fn test_poisson_deviance_scales_rates_by_exposure() {
    let counts = array![0.0, 1.0];
    let with_exposure =
        poisson_deviance_with_exposure(&counts, &array![0.2, 0.4], &array![0.5, 1.0]).unwrap();
    let direct = poisson_deviance(&counts, &array![0.1, 0.4]).unwrap();
    assert!((with_exposure - direct).abs() < 1e-12);
}

#[test]
fn test_gamma_deviance_zero_at_truth() {
    let severities = array![500.0, 1200.0, 80.0];
    let d = gamma_deviance(&severities, &severities, &array![1.0, 2.0, 1.0]).unwrap();
    assert!(d.abs() < 1e-12);

    assert!(matches!(
        gamma_deviance(&array![0.0], &array![100.0], &array![1.0]),
        Err(InsightError::ValidationError(_))
    ));
}

// ============================================================================
// Lift tables
// ============================================================================

#[test]
fn test_lift_from_csv_test_set() {
    let (_dir, data) = load_from_csv(&mut scored_policies());

    let single = loss_ratio_lift(&data, "glm", "gbm", 1).unwrap();
    assert_eq!(single.n_bins(), 1);
    let ratio = single.metric("loss_ratio").unwrap()[0];
    assert!((ratio - 980.0 / 780.0).abs() < 1e-12);

    let table = loss_ratio_lift(&data, "glm", "gbm", 3).unwrap();
    let exposure: f64 = table.bins.iter().map(|b| b.exposure).sum();
    assert!((exposure - 6.0).abs() < 1e-12);
    assert!(table.bins.windows(2).all(|w| w[0].upper <= w[1].lower));
    assert_eq!(
        table.bins.iter().map(|b| b.n_obs).sum::<usize>(),
        data.height()
    );
}

#[test]
fn test_double_lift_reports_both_errors() {
    let data = Dataset::new(scored_policies());
    let table = double_lift(&data, "glm", "gbm", 2).unwrap();
    assert_eq!(table.metrics, vec!["gbm_error", "glm_error"]);
    assert!(table.bins.iter().all(|b| b.values.len() == 2));
}

#[test]
fn test_configured_columns() {
    let mut frame = scored_policies();
    frame.rename("amount", "claim_cost".into()).unwrap();
    frame.rename("expo", "exposure".into()).unwrap();
    let data = Dataset::new(frame);

    let analyzer = LiftAnalyzer::new(
        LiftConfig::new()
            .with_loss_column("claim_cost")
            .with_exposure_column("exposure"),
    );
    let table = analyzer.loss_ratio_lift(&data, "glm", "gbm", 2).unwrap();
    assert_eq!(table.benchmark, "glm");
    assert_eq!(table.competitor, "gbm");

    assert!(matches!(
        loss_ratio_lift(&data, "glm", "gbm", 2),
        Err(InsightError::MissingFeature(_))
    ));
}

#[test]
fn test_non_positive_benchmark_rejected() {
    let data = Dataset::new(
        df!(
            "expo" => &[1.0, 1.0],
            "amount" => &[0.0, 10.0],
            "glm" => &[0.0, 100.0],
            "gbm" => &[50.0, 60.0]
        )
        .unwrap(),
    );
    assert!(matches!(
        loss_ratio_lift(&data, "glm", "gbm", 2),
        Err(InsightError::ValidationError(_))
    ));
}

// ============================================================================
// Gini ranking
// ============================================================================

#[test]
fn test_gini_ranking_from_dataset() {
    let data = Dataset::new(scored_policies());
    let ranking = LiftAnalyzer::default().gini_ranking(&data, &["glm", "gbm"]).unwrap();

    assert_eq!(ranking.names, vec!["glm", "gbm"]);
    assert_eq!(ranking.matrix.len(), 2);
    assert_eq!(ranking.matrix[0][0], 0.0);
    assert_eq!(ranking.matrix[1][1], 0.0);
    assert_eq!(ranking.ranking.len(), 2);

    let best = ranking.best().unwrap();
    let worst = ranking.ranking.last().unwrap();
    assert!(best.worst_case <= worst.worst_case);
}

#[test]
fn test_gini_report_csv() {
    let data = Dataset::new(scored_policies());
    let ranking = LiftAnalyzer::default().gini_ranking(&data, &["glm", "gbm"]).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gini.csv");
    write_csv(&ranking, &path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("baseline,glm,gbm,max_gini,rank"));
}
