use std::cmp::Ordering;
use std::str::FromStr;

use crate::error::AppError;
use crate::models::CourseRow;

const DATE_DISPLAY: &str = "%d/%m/%Y";

/// Displayed columns of the course table, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Id,
    Nombre,
    FechaInicio,
    FechaFin,
}

impl Column {
    pub const ALL: [Column; 4] = [Column::Id, Column::Nombre, Column::FechaInicio, Column::FechaFin];

    pub fn key(self) -> &'static str {
        match self {
            Column::Id => "id",
            Column::Nombre => "nombre",
            Column::FechaInicio => "fecha_inicio",
            Column::FechaFin => "fecha_fin",
        }
    }

    /// Cell text as shown in the table.
    pub fn render(self, row: &CourseRow) -> String {
        let course = &row.course;
        match self {
            Column::Id => course.id.to_string(),
            Column::Nombre => course.nombre.clone().unwrap_or_default(),
            Column::FechaInicio => course.fecha_inicio.format(DATE_DISPLAY).to_string(),
            Column::FechaFin => course.fecha_fin.format(DATE_DISPLAY).to_string(),
        }
    }

    fn compare(self, left: &CourseRow, right: &CourseRow) -> Ordering {
        let (l, r) = (&left.course, &right.course);
        match self {
            Column::Id => l.id.cmp(&r.id),
            Column::Nombre => {
                let l = l.nombre.as_ref().map(|n| n.to_lowercase());
                let r = r.nombre.as_ref().map(|n| n.to_lowercase());
                l.cmp(&r)
            }
            Column::FechaInicio => l.fecha_inicio.cmp(&r.fecha_inicio),
            Column::FechaFin => l.fecha_fin.cmp(&r.fecha_fin),
        }
    }
}

impl FromStr for Column {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Column::ALL
            .into_iter()
            .find(|column| column.key() == s)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown column: {}", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortState {
    pub active: Option<(Column, SortDirection)>,
}

impl SortState {
    /// Header click: new column sorts ascending, then descending, then clears.
    pub fn toggle(&mut self, column: Column) {
        self.active = match self.active {
            Some((current, SortDirection::Ascending)) if current == column => {
                Some((column, SortDirection::Descending))
            }
            Some((current, SortDirection::Descending)) if current == column => None,
            _ => Some((column, SortDirection::Ascending)),
        };
    }

    pub fn apply(&self, rows: &mut [CourseRow]) {
        let Some((column, direction)) = self.active else {
            return;
        };
        rows.sort_by(|left, right| {
            let ordering = column.compare(left, right);
            match direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        });
    }
}

pub fn normalize_filter(text: &str) -> String {
    text.trim().to_lowercase()
}

/// `needle` must already be normalized.
pub fn matches_filter(row: &CourseRow, needle: &str) -> bool {
    needle.is_empty()
        || Column::ALL
            .iter()
            .any(|column| column.render(row).to_lowercase().contains(needle))
}

/// Filtered, then sorted, copy of `rows`.
pub fn visible_rows(rows: &[CourseRow], filter: &str, sort: &SortState) -> Vec<CourseRow> {
    let mut visible: Vec<CourseRow> = rows
        .iter()
        .filter(|row| matches_filter(row, filter))
        .cloned()
        .collect();
    sort.apply(&mut visible);
    visible
}
