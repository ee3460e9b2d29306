use fantasy_prep::{
    init_logging, log_app_start, log_data_source, logging_config_from_env,
    prepare_config_from_env, run_prepare, PrepareOutcome,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logging_cfg = logging_config_from_env("prepare");
    init_logging(&logging_cfg)?;
    log_app_start(&logging_cfg);

    let cfg = prepare_config_from_env()?;
    let reason = std::env::var("FPREP_DATA_DIR")
        .ok()
        .map(|_| "FPREP_DATA_DIR");
    log_data_source(&logging_cfg, &cfg.data_dir, reason);

    match run_prepare(&cfg)? {
        PrepareOutcome::Written(report) => {
            println!(
                "Wrote {} rows x {} columns ({} features) to {}",
                report.rows,
                report.columns,
                report.feature_columns,
                report.output_path.display()
            );
        }
        PrepareOutcome::NoData { weekly_files } => {
            println!(
                "No data! {} weekly files under {} produced no rows; nothing written.",
                weekly_files,
                cfg.data_dir.display()
            );
        }
    }

    Ok(())
}
