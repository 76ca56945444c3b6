mod api;
mod cli;
mod config;
mod dates;
mod db;
mod notify;
mod scheduler;
mod status;

use crate::cli::onboard::run_onboarding;
use crate::cli::{Cli, Commands, ConfigCommands, RangeArgs, TemplateCommands};
use crate::config::{Config, FISCAL_FORMATS, parse_hhmm};
use crate::db::{Database, TemplateRow};
use crate::scheduler::ReminderSettings;
use crate::status::scheme::CategoryScheme;
use crate::status::{ValidationError, generate_status, render};
use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local, NaiveDate, TimeZone};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Onboard => {
            let _ = run_onboarding()?;
            Ok(())
        }
        Commands::Add {
            content,
            category,
            date,
            time,
        } => handle_add(content, category, date, time),
        Commands::List { range } => handle_list(&range),
        Commands::Edit {
            id,
            content,
            category,
            date,
            time,
        } => handle_edit(&id, content, category, date, time),
        Commands::Delete { id } => handle_delete(&id),
        Commands::Template { command } => handle_template_command(command),
        Commands::Generate {
            template,
            template_file,
            range,
            out,
            text,
        } => handle_generate(template, template_file, &range, out, text),
        Commands::Config { command } => handle_config_command(command),
        Commands::Status => handle_status(),
        Commands::Doctor => handle_doctor(),
        Commands::Service => {
            let config = load_config()?;
            run_service(config).await
        }
    }
}

fn handle_add(
    content: String,
    category: Option<String>,
    date: Option<String>,
    time: Option<String>,
) -> Result<()> {
    if content.trim().is_empty() {
        return Err(ValidationError::EmptyContent.into());
    }

    let config = load_config()?;
    let category = match normalized_category(category.as_deref()) {
        Some(given) => given,
        None => load_scheme(&config)?.categorize(&content),
    };
    let logged_at = local_timestamp_millis(date.as_deref(), time.as_deref(), Local::now())?;

    let database = Database::open(&config.db_path)?;
    let entry = database.insert_entry(&content, &category, logged_at)?;

    println!("Entry saved: {} [{}]", entry.id, entry.category);
    Ok(())
}

fn handle_list(range: &RangeArgs) -> Result<()> {
    let config = load_config()?;
    let today = Local::now().date_naive();
    let (start, end) = resolve_range(range, &config, (today, today))?;

    let database = Database::open(&config.db_path)?;
    let mut entries = database.entries_between_dates(start, end)?;
    entries.reverse();

    println!(
        "Entries {} ({})",
        dates::format_date_range(start, end),
        entries.len()
    );

    for entry in entries {
        let logged = Local
            .timestamp_millis_opt(entry.logged_at)
            .single()
            .with_context(|| format!("Entry has an out-of-range timestamp: {}", entry.id))?;

        println!(
            "{}  {} {}  [{}]  {}",
            entry.id,
            dates::format_date(logged.date_naive()),
            dates::format_clock(&logged),
            entry.category,
            single_line(&entry.content)
        );
    }

    Ok(())
}

fn handle_edit(
    id: &str,
    content: Option<String>,
    category: Option<String>,
    date: Option<String>,
    time: Option<String>,
) -> Result<()> {
    if let Some(changed) = content.as_deref() {
        if changed.trim().is_empty() {
            return Err(ValidationError::EmptyContent.into());
        }
    }

    let config = load_config()?;
    let database = Database::open(&config.db_path)?;
    let current = database
        .entry(id)?
        .with_context(|| format!("Entry not found: {id}"))?;

    // Changing the content without naming a category re-runs the categorizer.
    let category = match (normalized_category(category.as_deref()), content.as_deref()) {
        (Some(given), _) => Some(given),
        (None, Some(changed)) => Some(load_scheme(&config)?.categorize(changed)),
        (None, None) => None,
    };

    let logged_at = if date.is_some() || time.is_some() {
        let baseline = Local
            .timestamp_millis_opt(current.logged_at)
            .single()
            .with_context(|| format!("Entry has an out-of-range timestamp: {id}"))?;

        Some(local_timestamp_millis(
            date.as_deref(),
            time.as_deref(),
            baseline,
        )?)
    } else {
        None
    };

    database.update_entry(id, content.as_deref(), category.as_deref(), logged_at)?;
    println!("Entry updated: {id}");
    Ok(())
}

fn handle_delete(id: &str) -> Result<()> {
    let config = load_config()?;
    let database = Database::open(&config.db_path)?;

    if !database.delete_entry(id)? {
        bail!("Entry not found: {id}");
    }

    println!("Entry deleted: {id}");
    Ok(())
}

fn handle_template_command(command: TemplateCommands) -> Result<()> {
    let config = load_config()?;
    let database = Database::open(&config.db_path)?;

    match command {
        TemplateCommands::Add {
            name,
            content,
            file,
        } => {
            let name = name.trim();
            if name.is_empty() {
                return Err(ValidationError::EmptyName.into());
            }

            let body = template_body(content, file)?.context("Provide --content or --file")?;
            if render::text_content(&body).is_empty() {
                return Err(ValidationError::EmptyTemplate.into());
            }
            if database.template_by_name(name)?.is_some() {
                bail!("Template name already exists: {name}");
            }

            let template = database.insert_template(name, &body)?;
            println!("Template saved: {} ({})", template.id, template.name);
            Ok(())
        }
        TemplateCommands::List => {
            let templates = database.list_templates()?;
            println!("Templates ({})", templates.len());

            for template in templates {
                println!("{}  {}", template.id, template.name);
            }
            Ok(())
        }
        TemplateCommands::Show { id_or_name } => {
            let template = find_template(&database, &id_or_name)?;
            println!("{}", template.content);
            Ok(())
        }
        TemplateCommands::Edit {
            id_or_name,
            name,
            content,
            file,
        } => {
            let template = find_template(&database, &id_or_name)?;

            let name = name.as_deref().map(str::trim);
            if name == Some("") {
                return Err(ValidationError::EmptyName.into());
            }
            if let Some(renamed) = name {
                if renamed != template.name && database.template_by_name(renamed)?.is_some() {
                    bail!("Template name already exists: {renamed}");
                }
            }

            let body = template_body(content, file)?;
            if let Some(changed) = body.as_deref() {
                if render::text_content(changed).is_empty() {
                    return Err(ValidationError::EmptyTemplate.into());
                }
            }

            database.update_template(&template.id, name, body.as_deref())?;
            println!("Template updated: {}", template.id);
            Ok(())
        }
        TemplateCommands::Delete { id_or_name } => {
            let template = find_template(&database, &id_or_name)?;
            database.delete_template(&template.id)?;

            println!("Template deleted: {} ({})", template.id, template.name);
            Ok(())
        }
    }
}

fn handle_generate(
    template: Option<String>,
    template_file: Option<PathBuf>,
    range: &RangeArgs,
    out: Option<PathBuf>,
    text: bool,
) -> Result<()> {
    let config = load_config()?;
    let scheme = load_scheme(&config)?;
    let today = Local::now().date_naive();
    let (start, end) = resolve_range(range, &config, dates::current_week(today))?;

    let database = Database::open(&config.db_path)?;
    let body = match (template, template_file) {
        (Some(id_or_name), None) => find_template(&database, &id_or_name)?.content,
        (None, Some(path)) => fs::read_to_string(&path)
            .with_context(|| format!("Failed to read template file: {}", path.display()))?,
        (None, None) => bail!("Provide --template or --template-file"),
        (Some(_), Some(_)) => bail!("Use --template or --template-file, not both"),
    };

    let report = generate_status(&database, &scheme, start, end, &body)?;
    let output = if text { report.text } else { report.html };

    match out {
        Some(path) => {
            let path = resolve_out_path(&config, path);
            if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create report directory: {}", parent.display())
                })?;
            }

            fs::write(&path, &output)
                .with_context(|| format!("Failed to write report: {}", path.display()))?;
            println!("Report written: {}", path.display());
        }
        None => println!("{output}"),
    }

    Ok(())
}

fn handle_config_command(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Set { key, value } => {
            let mut config = load_or_default_config()?;
            config.set_value(&key, &value)?;
            config.ensure_bootstrap_files()?;
            config.save()?;

            // Picking a scheme by name swaps the scheme file to that
            // built-in, discarding hand edits.
            if matches!(key.as_str(), "category_scheme" | "scheme" | "scheme.name") {
                config.write_builtin_scheme()?;
                println!("Scheme file reset: {}", config.scheme_path.display());
            }

            println!("Config saved: {key} = {value}");
            Ok(())
        }
        ConfigCommands::Get { key } => {
            let config = load_config()?;
            let value = config
                .get_value(&key)
                .with_context(|| format!("Unsupported config key: {key}"))?;

            println!("{value}");
            Ok(())
        }
    }
}

fn handle_status() -> Result<()> {
    let config = load_config()?;
    let database = Database::open(&config.db_path)?;
    let scheme = load_scheme(&config)?;
    let now = Local::now();

    println!("UpdateMe status");
    println!("- scheme: {}", scheme.name);
    println!("- entries: {}", database.entry_count()?);
    for (category, count) in database.entry_counts_by_category()? {
        println!("  - {category}: {count}");
    }
    println!("- templates: {}", database.template_count()?);
    println!(
        "- last_logged_at: {}",
        database
            .latest_entry_timestamp()?
            .and_then(|millis| Local.timestamp_millis_opt(millis).single())
            .map(|logged| {
                format!(
                    "{} {}",
                    dates::format_date(logged.date_naive()),
                    dates::format_clock(&logged)
                )
            })
            .unwrap_or_else(|| "none".to_string())
    );

    let settings = ReminderSettings::from(&config);
    println!(
        "- next_reminder: {}",
        scheduler::next_reminder(now, &settings)?
            .map(|(fire_at, kind)| format!(
                "{} {} ({})",
                dates::format_date(fire_at.date_naive()),
                dates::format_clock(&fire_at),
                kind.title()
            ))
            .unwrap_or_else(|| "disabled".to_string())
    );

    if config.use_quarters {
        println!(
            "- fiscal_quarter: {}",
            dates::fiscal_quarter_label(
                now.date_naive(),
                config.fiscal_year_start_month,
                config.fiscal_year_start_day,
                &config.fiscal_year_format,
            )
        );
    }

    Ok(())
}

fn handle_doctor() -> Result<()> {
    let config_path = Config::config_path()?;
    let mut issues = Vec::new();

    if config_path.exists() {
        println!("[OK] config.json found: {}", config_path.display());
    } else {
        println!("[WARN] config.json not found: {}", config_path.display());
        issues.push("config missing".to_string());
    }

    let config = load_or_default_config()?;

    match Database::open(&config.db_path) {
        Ok(_) => println!("[OK] SQLite reachable: {}", config.db_path.display()),
        Err(error) => {
            println!("[WARN] SQLite check failed: {error}");
            issues.push("db unreachable".to_string());
        }
    }

    match CategoryScheme::load(&config.scheme_path) {
        Ok(scheme) => println!(
            "[OK] scheme file valid: {} ({} categories)",
            config.scheme_path.display(),
            scheme.categories.len()
        ),
        Err(error) => {
            println!("[WARN] scheme check failed: {error}");
            issues.push("scheme invalid".to_string());
        }
    }

    if let Err(error) = config.parse_reminder_time() {
        println!("[WARN] invalid reminder_time setting: {error}");
        issues.push("invalid reminder_time".to_string());
    } else {
        println!("[OK] reminder_time format valid: {}", config.reminder_time);
    }

    if config.export_dir.exists() {
        println!("[OK] export dir exists: {}", config.export_dir.display());
    } else {
        println!("[WARN] export dir missing: {}", config.export_dir.display());
        issues.push("export dir missing".to_string());
    }

    let month_valid = (1..=12).contains(&config.fiscal_year_start_month);
    let day_valid = (1..=31).contains(&config.fiscal_year_start_day);
    if month_valid && day_valid {
        println!(
            "[OK] fiscal year start valid: month {} day {}",
            config.fiscal_year_start_month, config.fiscal_year_start_day
        );
    } else {
        println!(
            "[WARN] fiscal year start out of range: month {} day {}",
            config.fiscal_year_start_month, config.fiscal_year_start_day
        );
        issues.push("fiscal year start invalid".to_string());
    }

    if FISCAL_FORMATS.contains(&config.fiscal_year_format.as_str()) {
        println!("[OK] fiscal format valid: {}", config.fiscal_year_format);
    } else {
        println!(
            "[WARN] unknown fiscal format: {} (expected one of {})",
            config.fiscal_year_format,
            FISCAL_FORMATS.join(", ")
        );
        issues.push("unknown fiscal format".to_string());
    }

    if issues.is_empty() {
        println!("doctor result: no issues");
    } else {
        println!("doctor result: {} warning(s)", issues.len());
    }

    Ok(())
}

async fn run_service(config: Config) -> Result<()> {
    config.ensure_bootstrap_files()?;
    let _ = Database::open(&config.db_path)?;

    let shared_config = Arc::new(config);
    let settings_fallback = Arc::clone(&shared_config);
    let api_config = Arc::clone(&shared_config);

    info!("UpdateMe service started");

    tokio::select! {
        scheduler_result = scheduler::run_reminder_scheduler(
            move || {
                let runtime = Config::load().unwrap_or_else(|_| (*settings_fallback).clone());
                Ok(ReminderSettings::from(&runtime))
            },
            |kind| async move { notify::send_reminder(kind) },
        ) => {
            scheduler_result?;
        }
        api_result = api::run_server(api_config) => {
            api_result?;
        }
        _ = signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    Ok(())
}

fn resolve_range(
    range: &RangeArgs,
    config: &Config,
    fallback: (NaiveDate, NaiveDate),
) -> Result<(NaiveDate, NaiveDate)> {
    let today = Local::now().date_naive();

    if range.week {
        return Ok(dates::current_week(today));
    }
    if range.fortnight {
        return Ok(dates::last_two_weeks(today));
    }
    if range.quarter {
        return Ok(dates::fiscal_quarter_range(
            today,
            config.fiscal_year_start_month,
            config.fiscal_year_start_day,
        ));
    }

    match (range.from.as_deref(), range.to.as_deref()) {
        (Some(from), Some(to)) => Ok((parse_date(from)?, parse_date(to)?)),
        // Both bounds or neither; a lone bound is rejected.
        (Some(_), None) | (None, Some(_)) => Err(ValidationError::MissingDateRange.into()),
        (None, None) => Ok(fallback),
    }
}

/// Assembles a local epoch-millisecond timestamp from optional date and
/// time strings, filling missing parts from `baseline`.
fn local_timestamp_millis(
    date: Option<&str>,
    time: Option<&str>,
    baseline: DateTime<Local>,
) -> Result<i64> {
    let day = match date {
        Some(raw) => parse_date(raw)?,
        None => baseline.date_naive(),
    };
    let clock = match time {
        Some(raw) => parse_hhmm(raw)?,
        None => baseline.time(),
    };

    Local
        .from_local_datetime(&day.and_time(clock))
        .single()
        .with_context(|| format!("Ambiguous local time: {day} {clock}"))
        .map(|moment| moment.timestamp_millis())
}

fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .with_context(|| format!("Invalid date format: {input}. Example: 2026-01-31"))
}

fn normalized_category(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_lowercase)
}

fn single_line(content: &str) -> String {
    render::text_content(content)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn find_template(database: &Database, id_or_name: &str) -> Result<TemplateRow> {
    if let Some(template) = database.template(id_or_name)? {
        return Ok(template);
    }

    database
        .template_by_name(id_or_name)?
        .with_context(|| format!("Template not found: {id_or_name}"))
}

fn template_body(content: Option<String>, file: Option<PathBuf>) -> Result<Option<String>> {
    match (content, file) {
        (Some(inline), None) => Ok(Some(inline)),
        (None, Some(path)) => fs::read_to_string(&path)
            .map(Some)
            .with_context(|| format!("Failed to read template file: {}", path.display())),
        (None, None) => Ok(None),
        (Some(_), Some(_)) => bail!("Use --content or --file, not both"),
    }
}

// Bare file names land in the configured export directory; anything with a
// directory component is taken as given.
fn resolve_out_path(config: &Config, out: PathBuf) -> PathBuf {
    match out.parent() {
        Some(parent) if parent.as_os_str().is_empty() => config.export_dir.join(out),
        _ => out,
    }
}

fn load_scheme(config: &Config) -> Result<CategoryScheme> {
    CategoryScheme::load(&config.scheme_path).with_context(|| {
        format!(
            "Failed to load category scheme: {}",
            config.scheme_path.display()
        )
    })
}

fn load_or_default_config() -> Result<Config> {
    Config::load().or_else(|_| {
        let config = Config::default();
        config.ensure_bootstrap_files()?;
        config.save()?;
        Ok(config)
    })
}

fn load_config() -> Result<Config> {
    Config::load()
        .with_context(|| "Config file not found. Run `updateme onboard` first.".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Duration, Weekday};

    fn bare_range() -> RangeArgs {
        RangeArgs {
            from: None,
            to: None,
            week: false,
            fortnight: false,
            quarter: false,
        }
    }

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn fallback() -> (NaiveDate, NaiveDate) {
        (date(2000, 1, 1), date(2000, 1, 1))
    }

    #[test]
    fn explicit_range_parses_both_bounds() {
        let range = RangeArgs {
            from: Some("2026-02-02".to_string()),
            to: Some("2026-02-06".to_string()),
            ..bare_range()
        };

        let resolved = resolve_range(&range, &Config::default(), fallback()).unwrap();

        assert_eq!(resolved, (date(2026, 2, 2), date(2026, 2, 6)));
    }

    #[test]
    fn from_without_to_is_rejected() {
        let range = RangeArgs {
            from: Some("2026-02-02".to_string()),
            ..bare_range()
        };

        let error = resolve_range(&range, &Config::default(), fallback()).unwrap_err();

        assert_eq!(
            error.downcast_ref::<ValidationError>(),
            Some(&ValidationError::MissingDateRange)
        );
    }

    #[test]
    fn to_without_from_is_rejected() {
        let range = RangeArgs {
            to: Some("2026-02-06".to_string()),
            ..bare_range()
        };

        let error = resolve_range(&range, &Config::default(), fallback()).unwrap_err();

        assert_eq!(
            error.downcast_ref::<ValidationError>(),
            Some(&ValidationError::MissingDateRange)
        );
    }

    #[test]
    fn bare_invocation_uses_the_fallback_range() {
        let expected = (date(2026, 3, 1), date(2026, 3, 7));
        let resolved = resolve_range(&bare_range(), &Config::default(), expected).unwrap();

        assert_eq!(resolved, expected);
    }

    #[test]
    fn week_flag_selects_sunday_through_saturday() {
        let range = RangeArgs {
            week: true,
            ..bare_range()
        };

        let (start, end) = resolve_range(&range, &Config::default(), fallback()).unwrap();

        assert_eq!(start.weekday(), Weekday::Sun);
        assert_eq!(end - start, Duration::days(6));
    }

    #[test]
    fn timestamps_assemble_from_date_and_time_parts() {
        let baseline = Local.with_ymd_and_hms(2026, 8, 19, 14, 45, 30).unwrap();

        let assembled =
            local_timestamp_millis(Some("2026-03-05"), Some("09:30"), baseline).unwrap();
        let expected = Local
            .with_ymd_and_hms(2026, 3, 5, 9, 30, 0)
            .unwrap()
            .timestamp_millis();
        assert_eq!(assembled, expected);

        let unchanged = local_timestamp_millis(None, None, baseline).unwrap();
        assert_eq!(unchanged, baseline.timestamp_millis());
    }

    #[test]
    fn bare_out_names_land_in_the_export_dir() {
        let config = Config::default();

        let bare = resolve_out_path(&config, PathBuf::from("weekly.html"));
        assert_eq!(bare, config.export_dir.join("weekly.html"));

        let nested = resolve_out_path(&config, PathBuf::from("./weekly.html"));
        assert_eq!(nested, PathBuf::from("./weekly.html"));
    }
}
