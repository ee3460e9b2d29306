use fantasy_prep::{
    init_logging, log_app_start, logging_config_from_env, partition_request_from_env,
    partition_training_table,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logging_cfg = logging_config_from_env("partition");
    init_logging(&logging_cfg)?;
    log_app_start(&logging_cfg);

    let req = partition_request_from_env()?;
    let report = partition_training_table(&req)?;

    println!(
        "{} {} week {}: training={} rows ({}) test={} rows ({})",
        req.position,
        req.year,
        req.week,
        report.training_rows,
        report.training_path.display(),
        report.test_rows,
        report.test_path.display()
    );

    Ok(())
}
