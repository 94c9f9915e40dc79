use clap::Subcommand;
use pomoflow_core::stats::local_today;
use pomoflow_core::AppConfig;

use crate::session;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's stats
    Today,
    /// This week, Monday onwards
    Week,
    /// This calendar month
    Month,
    /// Consecutive days with at least one pomodoro
    Streak,
    /// Archived days, newest first
    History,
    /// Archive yesterday's record if the date has changed
    Rollover,
}

pub fn run(action: StatsAction, config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = session::open(config);

    match action {
        StatsAction::Today => session::print_json(app.today())?,
        StatsAction::Week => session::print_json(&app.week())?,
        StatsAction::Month => session::print_json(&app.month())?,
        StatsAction::Streak => {
            session::print_json(&serde_json::json!({ "streak_days": app.streak() }))?
        }
        StatsAction::History => session::print_json(&app.history())?,
        StatsAction::Rollover => {
            let rolled = app.roll_over_day(local_today());
            session::print_json(&serde_json::json!({
                "rolled_over": rolled,
                "today": app.today(),
            }))?
        }
    }
    Ok(())
}
