//! Dispatch board
//!
//! Column model behind the office's drag-and-drop dispatch view: one
//! `Unassigned` column plus one column per truck, each an ordered list of
//! job cards. Saving emits the `POST /dispatch` body with 1-based run order
//! per truck.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use doorflow_api::{Assignment, DispatchDay, DispatchRequest};
use serde::Serialize;
use tracing::warn;

/// Dispatch errors
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Job {0} is not on the board")]
    UnknownJob(String),

    #[error("No column for truck {0}")]
    UnknownColumn(String),
}

/// Board column
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Unassigned,
    Truck(String),
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Column::Unassigned => f.write_str("unassigned"),
            Column::Truck(id) => f.write_str(id),
        }
    }
}

impl FromStr for Column {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(if s.eq_ignore_ascii_case("unassigned") {
            Column::Unassigned
        } else {
            Column::Truck(s.to_string())
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobCard {
    pub job_id: String,
    pub job_number: String,
    pub customer_name: String,
    pub is_visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardColumn {
    pub column: Column,
    pub title: String,
    pub cards: Vec<JobCard>,
}

/// A day's board
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchBoard {
    date: NaiveDate,
    columns: Vec<BoardColumn>,
}

impl DispatchBoard {
    /// Lay out a day. Jobs on trucks are ordered by their saved run order;
    /// jobs naming a truck the day does not list land in `Unassigned`.
    pub fn from_day(day: &DispatchDay) -> Self {
        let mut columns = vec![BoardColumn {
            column: Column::Unassigned,
            title: "Unassigned".to_string(),
            cards: Vec::new(),
        }];
        columns.extend(day.trucks.iter().map(|truck| BoardColumn {
            column: Column::Truck(truck.id.clone()),
            title: truck.name.clone(),
            cards: Vec::new(),
        }));

        let mut placed: Vec<(usize, Option<u32>, JobCard)> = Vec::new();
        for entry in &day.jobs {
            let card = JobCard {
                job_id: entry.job_id.clone(),
                job_number: entry.job_number.clone(),
                customer_name: entry.customer_name.clone(),
                is_visible: entry.is_visible,
            };
            let index = match &entry.truck_id {
                None => 0,
                Some(truck_id) => match columns.iter().position(|c| c.column == Column::Truck(truck_id.clone())) {
                    Some(i) => i,
                    None => {
                        warn!(job_id = %entry.job_id, truck_id = %truck_id, "job assigned to unknown truck");
                        0
                    }
                },
            };
            let order = if index == 0 { None } else { entry.job_order };
            placed.push((index, order, card));
        }

        // Stable: unordered cards keep backend order, after ordered ones
        placed.sort_by_key(|(index, order, _)| (*index, order.is_none(), order.unwrap_or(0)));
        for (index, _, card) in placed {
            columns[index].cards.push(card);
        }

        Self { date: day.date, columns }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn columns(&self) -> &[BoardColumn] {
        &self.columns
    }

    pub fn column(&self, column: &Column) -> Option<&BoardColumn> {
        self.columns.iter().find(|c| &c.column == column)
    }

    /// Column and position of a job
    pub fn locate(&self, job_id: &str) -> Option<(&Column, usize)> {
        self.columns.iter().find_map(|c| {
            c.cards
                .iter()
                .position(|card| card.job_id == job_id)
                .map(|pos| (&c.column, pos))
        })
    }

    /// Move a card to `index` in `to` (clamped to the column's length)
    pub fn move_job(&mut self, job_id: &str, to: &Column, index: usize) -> Result<(), DispatchError> {
        let target = self
            .columns
            .iter()
            .position(|c| &c.column == to)
            .ok_or_else(|| DispatchError::UnknownColumn(to.to_string()))?;
        let card = self.take(job_id)?;
        let cards = &mut self.columns[target].cards;
        cards.insert(index.min(cards.len()), card);
        Ok(())
    }

    pub fn set_visible(&mut self, job_id: &str, visible: bool) -> Result<(), DispatchError> {
        let card = self
            .columns
            .iter_mut()
            .flat_map(|c| c.cards.iter_mut())
            .find(|card| card.job_id == job_id)
            .ok_or_else(|| DispatchError::UnknownJob(job_id.to_string()))?;
        card.is_visible = visible;
        Ok(())
    }

    fn take(&mut self, job_id: &str) -> Result<JobCard, DispatchError> {
        for column in &mut self.columns {
            if let Some(pos) = column.cards.iter().position(|c| c.job_id == job_id) {
                return Ok(column.cards.remove(pos));
            }
        }
        Err(DispatchError::UnknownJob(job_id.to_string()))
    }

    /// Save body: truck columns only, run order 1-based
    pub fn to_request(&self) -> DispatchRequest {
        let assignments = self
            .columns
            .iter()
            .filter_map(|c| match &c.column {
                Column::Truck(truck_id) => Some((truck_id, &c.cards)),
                Column::Unassigned => None,
            })
            .flat_map(|(truck_id, cards)| {
                cards.iter().enumerate().map(move |(i, card)| Assignment {
                    job_id: card.job_id.clone(),
                    truck_id: truck_id.clone(),
                    job_order: i as u32 + 1,
                    is_visible: card.is_visible,
                })
            })
            .collect();
        DispatchRequest {
            date: self.date,
            assignments,
        }
    }
}
