use crate::backend::domain::commands::summary::{
    DailyClosing as DomainDailyClosing, PeriodSummary as DomainPeriodSummary,
};
use shared::{DailyClosing, PeriodSummary};

pub struct SummaryMapper;

impl SummaryMapper {
    pub fn to_dto(domain: DomainPeriodSummary) -> PeriodSummary {
        PeriodSummary {
            start: domain.start.to_string(),
            end: domain.end.to_string(),
            opening_balance: domain.opening_balance,
            closing_balance: domain.closing_balance,
            total_allowance: domain.total_allowance,
            total_spent: domain.total_spent,
            total_bonus: domain.total_bonus,
            days: domain.days.into_iter().map(Self::daily_to_dto).collect(),
        }
    }

    fn daily_to_dto(domain: DomainDailyClosing) -> DailyClosing {
        DailyClosing {
            day: domain.day.to_string(),
            closing_balance: domain.closing_balance,
            has_activity: domain.has_activity,
        }
    }
}
