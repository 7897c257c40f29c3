//! Candidate pool generation.
//!
//! Builds candidates from operating hours when a problem arrives without
//! a pre-computed pool. Slots start every `step_minutes` inside each open
//! window and last the level's catalog duration; on weekdays, slots
//! touching the lunch break are dropped. A slot is popular when it fits
//! entirely inside a popular window for its level and day.
//!
//! For every requirement, every coach qualified for the level and assigned
//! to the branch gets a candidate for each slot in a period they are
//! available.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::models::{Candidate, ClockTime, Day, Interval, SchedulingProblem};

/// A window in which one level's slots count as popular.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopularWindow {
    pub level: String,
    pub day: Day,
    pub start: ClockTime,
    pub end: ClockTime,
}

impl PopularWindow {
    pub fn new(level: impl Into<String>, day: Day, start: ClockTime, end: ClockTime) -> Self {
        Self {
            level: level.into(),
            day,
            start,
            end,
        }
    }

    fn covers(&self, level: &str, day: Day, slot: &Interval) -> bool {
        self.level == level && self.day == day && Interval::new(self.start, self.end).covers(slot)
    }
}

/// Operating hours and popularity data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationSettings {
    /// Open windows per day.
    pub operating_hours: BTreeMap<Day, Vec<Interval>>,
    /// Excluded on weekdays.
    pub lunch_break: Option<Interval>,
    /// Distance between consecutive slot starts.
    pub step_minutes: u32,
    pub popular_windows: Vec<PopularWindow>,
}

fn hm(hour: u16, minute: u16) -> ClockTime {
    ClockTime::new(hour, minute).unwrap_or(ClockTime::MIDNIGHT)
}

impl Default for GenerationSettings {
    fn default() -> Self {
        let weekday = vec![
            Interval::new(hm(10, 0), hm(12, 0)),
            Interval::new(hm(14, 0), hm(19, 0)),
        ];
        let weekend = vec![Interval::new(hm(8, 30), hm(18, 30))];

        let mut operating_hours = BTreeMap::new();
        operating_hours.insert(Day::Tue, vec![Interval::new(hm(15, 0), hm(19, 0))]);
        operating_hours.insert(Day::Wed, weekday.clone());
        operating_hours.insert(Day::Thu, weekday.clone());
        operating_hours.insert(Day::Fri, weekday);
        operating_hours.insert(Day::Sat, weekend.clone());
        operating_hours.insert(Day::Sun, weekend);

        Self {
            operating_hours,
            lunch_break: Some(Interval::new(hm(12, 0), hm(14, 0))),
            step_minutes: 30,
            popular_windows: Vec::new(),
        }
    }
}

impl GenerationSettings {
    pub fn with_popular_window(mut self, window: PopularWindow) -> Self {
        self.popular_windows.push(window);
        self
    }

    pub fn with_hours(mut self, day: Day, windows: Vec<Interval>) -> Self {
        self.operating_hours.insert(day, windows);
        self
    }
}

/// A timeslot for one level, before a coach is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub level: String,
    pub day: Day,
    pub interval: Interval,
    pub is_popular: bool,
}

/// Builds a candidate pool for a problem.
#[derive(Debug, Clone)]
pub struct CandidateGenerator<'a> {
    problem: &'a SchedulingProblem,
    settings: GenerationSettings,
}

impl<'a> CandidateGenerator<'a> {
    /// Uses the problem's generation settings, or the defaults.
    pub fn new(problem: &'a SchedulingProblem) -> Self {
        Self {
            problem,
            settings: problem.generation.clone().unwrap_or_default(),
        }
    }

    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Every slot for a level over the catalog's operating days.
    pub fn slots(&self, level: &str) -> Vec<Slot> {
        let catalog = &self.problem.catalog;
        let Some(duration) = catalog.duration(level) else {
            warn!(level, "no duration configured; level skipped");
            return Vec::new();
        };
        let step = self.settings.step_minutes.max(1);

        let mut slots = Vec::new();
        for day in catalog.operating_days() {
            let Some(windows) = self.settings.operating_hours.get(&day) else {
                continue;
            };
            let lunch = self
                .settings
                .lunch_break
                .filter(|_| catalog.is_weekday(day));

            for window in windows {
                let mut start = window.start.minutes();
                while start + duration <= window.end.minutes() {
                    let interval = ClockTime::from_minutes(start).and_then(|s| {
                        s.add_minutes(duration).map(|e| Interval::new(s, e))
                    });
                    if let Some(interval) = interval {
                        if !lunch.is_some_and(|l| l.overlaps(&interval)) {
                            let is_popular = self
                                .settings
                                .popular_windows
                                .iter()
                                .any(|w| w.covers(level, day, &interval));
                            slots.push(Slot {
                                level: level.to_string(),
                                day,
                                interval,
                                is_popular,
                            });
                        }
                    }
                    start += step;
                }
            }
        }
        slots
    }

    /// Builds the candidate pool with sequential ids.
    pub fn generate(&self) -> Vec<Candidate> {
        let catalog = &self.problem.catalog;
        let mut slots_by_level: BTreeMap<&str, Vec<Slot>> = BTreeMap::new();
        let mut candidates = Vec::new();
        let mut next_id = 0u32;

        for req in &self.problem.requirements {
            let slots = slots_by_level
                .entry(req.level.as_str())
                .or_insert_with(|| self.slots(&req.level));
            let capacity = catalog.capacity(&req.level);

            for coach in self.problem.qualified_coaches(&req.branch, &req.level) {
                for slot in slots.iter() {
                    if !coach.is_available(slot.day, slot.interval.start.period()) {
                        continue;
                    }
                    candidates.push(
                        Candidate::new(
                            next_id,
                            &coach.id,
                            &req.branch,
                            &req.level,
                            slot.day,
                            slot.interval.start,
                            slot.interval.end,
                        )
                        .with_capacity(capacity)
                        .with_popular(slot.is_popular),
                    );
                    next_id += 1;
                }
            }
        }

        debug!(
            candidates = candidates.len(),
            popular = candidates.iter().filter(|c| c.is_popular).count(),
            "candidate pool generated"
        );
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Catalog, Coach, DayAvailability, Requirement};

    fn t(s: &str) -> ClockTime {
        s.parse().unwrap()
    }

    #[test]
    fn test_weekday_slots_skip_lunch() {
        let problem = SchedulingProblem::new(Catalog::default());
        let generator = CandidateGenerator::new(&problem);
        let wed: Vec<Slot> = generator
            .slots("L1")
            .into_iter()
            .filter(|s| s.day == Day::Wed)
            .collect();
        let starts: Vec<String> = wed.iter().map(|s| s.interval.start.to_string()).collect();
        // 10:00-12:00 fits one 90-minute slot; 14:00-19:00 fits 14:00..=17:30
        assert_eq!(
            starts,
            vec!["10:00", "10:30", "14:00", "14:30", "15:00", "15:30", "16:00", "16:30", "17:00", "17:30"]
        );
    }

    #[test]
    fn test_lunch_applies_only_on_weekdays() {
        let settings = GenerationSettings::default()
            .with_hours(Day::Wed, vec![Interval::new(t("11:00"), t("13:00"))])
            .with_hours(Day::Sat, vec![Interval::new(t("11:00"), t("13:00"))]);
        let problem = SchedulingProblem::new(Catalog::default()).with_generation(settings);
        let slots = CandidateGenerator::new(&problem).slots("Jolly");
        assert!(slots.iter().filter(|s| s.day == Day::Wed).count() == 1);
        assert_eq!(slots.iter().filter(|s| s.day == Day::Sat).count(), 3);
    }

    #[test]
    fn test_popular_window_marks_contained_slots() {
        let settings = GenerationSettings::default().with_popular_window(PopularWindow::new(
            "L1",
            Day::Sat,
            t("09:00"),
            t("11:00"),
        ));
        let problem = SchedulingProblem::new(Catalog::default()).with_generation(settings);
        let popular: Vec<String> = CandidateGenerator::new(&problem)
            .slots("L1")
            .into_iter()
            .filter(|s| s.is_popular)
            .map(|s| s.interval.to_string())
            .collect();
        assert_eq!(popular, vec!["09:00-10:30", "09:30-11:00"]);
    }

    #[test]
    fn test_generate_respects_qualification_and_availability() {
        let morning_only = DayAvailability {
            morning: true,
            afternoon: false,
        };
        let problem = SchedulingProblem::new(Catalog::default())
            .with_coach(
                Coach::full_time("C1")
                    .with_qualification("L1")
                    .with_branch("BB")
                    .with_availability(Day::Wed, morning_only),
            )
            .with_coach(Coach::part_time("C2").with_qualification("L1").with_branch("KT"))
            .with_requirement(Requirement::new("BB", "L1", 10));

        let pool = CandidateGenerator::new(&problem).generate();
        assert_eq!(pool.len(), 2);
        assert!(pool.iter().all(|c| c.coach_id == "C1" && c.day == Day::Wed));
        assert_eq!(pool[0].id, 0);
        assert_eq!(pool[1].id, 1);
        assert_eq!(pool[0].capacity, 8);
        assert_eq!(pool[0].duration_minutes, 90);
    }

    #[test]
    fn test_unknown_level_has_no_slots() {
        let problem = SchedulingProblem::new(Catalog::default());
        assert!(CandidateGenerator::new(&problem).slots("Trampoline").is_empty());
    }
}
