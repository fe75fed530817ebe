use crate::backend::domain::commands::backfill::BackfillReport;
use crate::backend::domain::commands::balance::RecalculationReport;
use crate::backend::domain::commands::summary::AccountView;
use shared::{AccountResponse, BackfillResponse, RecalculateResponse, ValidationResponse};

pub struct AccountMapper;

impl AccountMapper {
    pub fn to_account_response(view: AccountView) -> AccountResponse {
        AccountResponse {
            current_balance: view.account.current_balance,
            daily_allowance: view.account.daily_allowance,
            last_processed_date: view.account.last_processed_date.to_string(),
            today: view.today.to_string(),
        }
    }

    pub fn to_backfill_response(report: BackfillReport) -> BackfillResponse {
        BackfillResponse {
            days_visited: report.days_visited,
            entries_appended: report.entries_appended,
            current_balance: report.current_balance,
            last_processed_date: report.last_processed_date.to_string(),
        }
    }

    pub fn to_recalculate_response(report: RecalculationReport) -> RecalculateResponse {
        RecalculateResponse {
            from_day: report.from_day.to_string(),
            days_recalculated: report.days_recalculated,
            days_changed: report.days_changed,
            current_balance: report.current_balance,
        }
    }

    pub fn to_validation_response(errors: Vec<String>) -> ValidationResponse {
        ValidationResponse {
            is_consistent: errors.is_empty(),
            errors,
        }
    }
}
