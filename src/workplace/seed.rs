//! Default workplaces of a fresh store.

use crate::config::SeedWorkplace;
use crate::workplace::NewWorkplace;

const FLOORS: [i64; 3] = [2, 4, 5];
const PER_FLOOR: i64 = 3;

/// Floors 2, 4 and 5 with three workplaces each.
///
/// Workplace `401` has `TSS-WS-4001` as primary PC.
pub fn default_seed() -> Vec<NewWorkplace> {
    FLOORS
        .iter()
        .flat_map(|floor| {
            (1..=PER_FLOOR).map(move |n| NewWorkplace {
                number: format!("{floor}{n:02}"),
                department: String::default(),
                location: format!("Floor {floor}"),
                floor: Some(*floor),
                primary_pc: Some(format!("TSS-WS-{floor}00{n}")),
                peripherals: None,
            })
        })
        .collect()
}

impl From<SeedWorkplace> for NewWorkplace {
    fn from(seed: SeedWorkplace) -> Self {
        Self {
            number: seed.number,
            department: seed.department,
            location: seed.location,
            floor: Some(seed.floor),
            primary_pc: seed.primary_pc,
            peripherals: seed.peripherals,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_seed() {
        let seed = default_seed();

        assert_eq!(seed.len(), 9);
        assert_eq!(seed[0].number, "201");
        assert_eq!(seed[0].primary_pc.as_deref(), Some("TSS-WS-2001"));
        assert_eq!(seed[8].number, "503");
        assert_eq!(seed[8].floor, Some(5));
    }
}
