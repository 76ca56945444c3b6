use crate::config::{Config, FISCAL_FORMATS, parse_hhmm};
use crate::db::Database;
use anyhow::{Context, Result};
use dialoguer::{Confirm, Input, Select, theme::ColorfulTheme};

pub fn run_onboarding() -> Result<Config> {
    println!("──────────────────────────────────────────");
    println!("  Welcome to UpdateMe onboarding.");
    println!("──────────────────────────────────────────");

    let theme = ColorfulTheme::default();

    println!("\n[1/3] Category scheme");
    println!("  Entries are auto-categorized by keyword and reports group by category.");

    let schemes = [
        "classic (achievement / blocker / progress / meeting)",
        "launch (meeting / launch / progress / blocker)",
    ];
    let selected_index = Select::with_theme(&theme)
        .with_prompt("  Select a category scheme")
        .default(0)
        .items(&schemes)
        .interact()
        .context("Failed to select category scheme")?;

    let category_scheme = if selected_index == 1 {
        "launch"
    } else {
        "classic"
    }
    .to_string();
    println!("  ✓ Scheme: {category_scheme}");

    println!("\n[2/3] Reminders");
    let reminder_enabled = Confirm::with_theme(&theme)
        .with_prompt("  Enable the daily entry reminder?")
        .default(true)
        .interact()
        .context("Failed to read reminder toggle")?;

    let reminder_time: String = Input::with_theme(&theme)
        .with_prompt("  Daily reminder time")
        .default("17:00".to_string())
        .validate_with(|input: &String| -> std::result::Result<(), &str> {
            parse_hhmm(input)
                .map(|_| ())
                .map_err(|_| "Use HH:MM format (example: 17:00)")
        })
        .interact_text()
        .context("Failed to read reminder time")?;

    let end_of_week_reminder = Confirm::with_theme(&theme)
        .with_prompt("  Also remind on Friday afternoon to prepare the weekly update?")
        .default(true)
        .interact()
        .context("Failed to read end-of-week toggle")?;

    if reminder_enabled {
        println!("  ✓ Daily reminder at {reminder_time}");
    } else {
        println!("  ✓ Daily reminder disabled");
    }
    if end_of_week_reminder {
        println!("  ✓ End-of-week reminder on Friday 15:00");
    }

    println!("\n[3/3] Fiscal year");
    let use_quarters = Confirm::with_theme(&theme)
        .with_prompt("  Track reporting periods by fiscal quarter?")
        .default(true)
        .interact()
        .context("Failed to read fiscal quarter toggle")?;

    let (fiscal_year_start_month, fiscal_year_format) = if use_quarters {
        let start_month: u32 = Input::with_theme(&theme)
            .with_prompt("  Fiscal year start month (1-12)")
            .default(1)
            .validate_with(|input: &u32| -> std::result::Result<(), &str> {
                if (1..=12).contains(input) {
                    Ok(())
                } else {
                    Err("Enter a month between 1 and 12")
                }
            })
            .interact_text()
            .context("Failed to read fiscal start month")?;

        let format_index = Select::with_theme(&theme)
            .with_prompt("  Fiscal year label format")
            .default(0)
            .items(&FISCAL_FORMATS)
            .interact()
            .context("Failed to select fiscal year format")?;
        let format = FISCAL_FORMATS
            .get(format_index)
            .copied()
            .unwrap_or("FY-YY")
            .to_string();

        println!("  ✓ Quarters start in month {start_month}, labeled like {format}");
        (start_month, format)
    } else {
        println!("  ✓ Fiscal quarters disabled");
        (1, "FY-YY".to_string())
    };

    let config = Config {
        category_scheme,
        reminder_enabled,
        reminder_time,
        end_of_week_reminder,
        fiscal_year_start_month,
        fiscal_year_format,
        use_quarters,
        ..Config::default()
    };

    config.ensure_bootstrap_files()?;
    config.save()?;
    let _ = Database::open(&config.db_path)?;

    println!("\n──────────────────────────────────────────");
    println!("  Onboarding complete!");
    println!("  Log your first entry with: updateme add \"Fixed the login bug\"");
    println!("  Run updateme status to check current state.");
    println!("──────────────────────────────────────────");

    Ok(config)
}
