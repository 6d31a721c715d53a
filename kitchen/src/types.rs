use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// Store department an ingredient is shopped from.
///
/// Closed set: the variants and their order are part of the wire contract.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "text"))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
pub enum Department {
    #[serde(rename = "produce")]
    Produce,
    #[serde(rename = "meat")]
    Meat,
    #[serde(rename = "seafood")]
    Seafood,
    #[serde(rename = "dairy")]
    Dairy,
    #[serde(rename = "bakery")]
    Bakery,
    #[serde(rename = "frozen")]
    Frozen,
    #[serde(rename = "pantry")]
    Pantry,
    #[serde(rename = "spices")]
    Spices,
    #[serde(rename = "beverages")]
    Beverages,
    #[serde(rename = "other")]
    #[default]
    Other,
}

impl Department {
    /// Aisle order used when presenting a grocery list.
    pub const ALL: [Department; 10] = [
        Department::Produce,
        Department::Meat,
        Department::Seafood,
        Department::Dairy,
        Department::Bakery,
        Department::Frozen,
        Department::Pantry,
        Department::Spices,
        Department::Beverages,
        Department::Other,
    ];

    pub fn rank(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Department::Produce => write!(f, "produce"),
            Department::Meat => write!(f, "meat"),
            Department::Seafood => write!(f, "seafood"),
            Department::Dairy => write!(f, "dairy"),
            Department::Bakery => write!(f, "bakery"),
            Department::Frozen => write!(f, "frozen"),
            Department::Pantry => write!(f, "pantry"),
            Department::Spices => write!(f, "spices"),
            Department::Beverages => write!(f, "beverages"),
            Department::Other => write!(f, "other"),
        }
    }
}

impl std::str::FromStr for Department {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "produce" => Ok(Department::Produce),
            "meat" => Ok(Department::Meat),
            "seafood" => Ok(Department::Seafood),
            "dairy" => Ok(Department::Dairy),
            "bakery" => Ok(Department::Bakery),
            "frozen" => Ok(Department::Frozen),
            "pantry" => Ok(Department::Pantry),
            "spices" => Ok(Department::Spices),
            "beverages" => Ok(Department::Beverages),
            "other" => Ok(Department::Other),
            _ => Err(format!("Unknown department: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "text"))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
pub enum ItemStatus {
    #[serde(rename = "pending")]
    #[default]
    Pending,
    #[serde(rename = "bought")]
    Bought,
    #[serde(rename = "have_on_hand")]
    HaveOnHand,
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemStatus::Pending => write!(f, "pending"),
            ItemStatus::Bought => write!(f, "bought"),
            ItemStatus::HaveOnHand => write!(f, "have_on_hand"),
        }
    }
}

impl std::str::FromStr for ItemStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ItemStatus::Pending),
            "bought" => Ok(ItemStatus::Bought),
            "have_on_hand" => Ok(ItemStatus::HaveOnHand),
            _ => Err(format!("Unknown item status: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "text"))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
pub enum MealType {
    #[serde(rename = "breakfast")]
    Breakfast,
    #[serde(rename = "lunch")]
    Lunch,
    #[serde(rename = "snack")]
    Snack,
    #[serde(rename = "dinner")]
    Dinner,
    #[serde(rename = "dessert")]
    Dessert,
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MealType::Breakfast => write!(f, "breakfast"),
            MealType::Lunch => write!(f, "lunch"),
            MealType::Snack => write!(f, "snack"),
            MealType::Dinner => write!(f, "dinner"),
            MealType::Dessert => write!(f, "dessert"),
        }
    }
}

impl std::str::FromStr for MealType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "breakfast" => Ok(MealType::Breakfast),
            "lunch" => Ok(MealType::Lunch),
            "snack" => Ok(MealType::Snack),
            "dinner" => Ok(MealType::Dinner),
            "dessert" => Ok(MealType::Dessert),
            _ => Err(format!("Unknown meal type: {s}")),
        }
    }
}

/// Inclusive range of calendar dates. Construction guarantees `start <= end`.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::invalid(format!(
                "start_date {start} must not be after end_date {end}"
            )));
        }

        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Days between `start` and `end`. A single-day range spans zero days.
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day <= end)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_department_order_matches_rank() {
        for (i, department) in Department::ALL.iter().enumerate() {
            assert_eq!(department.rank(), i);
        }
        assert!(Department::Produce < Department::Other);
    }

    #[test]
    fn test_department_wire_names_round_trip() {
        for department in Department::ALL {
            let wire = serde_json::to_string(&department).unwrap();
            assert_eq!(wire, format!("\"{department}\""));
            assert_eq!(department.to_string().parse::<Department>(), Ok(department));
        }
        assert!("deli".parse::<Department>().is_err());
    }

    #[test]
    fn test_item_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&ItemStatus::HaveOnHand).unwrap(),
            "\"have_on_hand\""
        );
        assert_eq!("bought".parse::<ItemStatus>(), Ok(ItemStatus::Bought));
    }

    #[test]
    fn test_date_range_rejects_inverted_bounds() {
        let err = DateRange::new(date("2024-01-07"), date("2024-01-01")).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let range = DateRange::new(date("2024-01-01"), date("2024-01-07")).unwrap();
        assert!(range.contains(date("2024-01-01")));
        assert!(range.contains(date("2024-01-07")));
        assert!(!range.contains(date("2024-01-08")));

        let single = DateRange::new(date("2024-01-01"), date("2024-01-01")).unwrap();
        assert!(single.contains(date("2024-01-01")));
    }

    #[test]
    fn test_date_range_days() {
        let range = DateRange::new(date("2024-02-27"), date("2024-03-01")).unwrap();
        assert_eq!(range.span_days(), 3);
        assert_eq!(
            range.days().collect::<Vec<_>>(),
            vec![
                date("2024-02-27"),
                date("2024-02-28"),
                date("2024-02-29"),
                date("2024-03-01")
            ]
        );

        let single = DateRange::new(date("2024-01-01"), date("2024-01-01")).unwrap();
        assert_eq!(single.span_days(), 0);
        assert_eq!(single.days().count(), 1);
    }
}
