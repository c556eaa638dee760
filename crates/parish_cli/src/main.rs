//! Register status probe.
//!
//! # Responsibility
//! - Open the configured register database and report its state.
//! - Exit non-zero when configuration, logging or storage setup fails.
//!
//! Usage: `parish_cli [config.json]`

use log::info;
use parish_core::db::migrations::current_user_version;
use parish_core::{
    core_version, init_logging, open_db, DateRange, MarriageListQuery, MemberListQuery,
    ParishRegister, RegisterConfig,
};
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("parish_cli: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), String> {
    let config = match std::env::args().nth(1) {
        Some(path) => RegisterConfig::load(Path::new(&path)).map_err(|err| err.to_string())?,
        None => RegisterConfig::default(),
    };
    if let Some(log_dir) = &config.log_dir {
        init_logging(&config.log_level, log_dir)?;
    }

    let conn = open_db(&config.database_path).map_err(|err| err.to_string())?;
    let schema_version = current_user_version(&conn).map_err(|err| err.to_string())?;
    let register = ParishRegister::with_policy(&conn, config.succession_policy);

    let families = register.list_families().map_err(|err| err.to_string())?;
    let headless = families.iter().filter(|family| family.is_headless()).count();
    let members = register
        .list_members(&MemberListQuery::default())
        .map_err(|err| err.to_string())?;
    let deaths = register
        .list_deaths(&DateRange::default())
        .map_err(|err| err.to_string())?;
    let marriages = register
        .list_marriages(&MarriageListQuery::default())
        .map_err(|err| err.to_string())?;
    let baptisms = register
        .list_baptisms(&DateRange::default())
        .map_err(|err| err.to_string())?;

    println!("parish_core version={}", core_version());
    println!("database={}", config.database_path.display());
    println!("schema_version={schema_version}");
    println!("families={} headless={}", families.len(), headless);
    println!("living_members={}", members.len());
    println!("death_records={}", deaths.len());
    println!("marriage_records={}", marriages.len());
    println!("baptism_records={}", baptisms.len());

    info!(
        "event=cli_status module=cli status=ok families={} members={}",
        families.len(),
        members.len()
    );
    Ok(())
}
