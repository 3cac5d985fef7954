//! Record builders and a small fixed dataset for tests.

use chrono::{NaiveDate, NaiveTime};
use crash_dash_collision_models::{
    Borough, Coordinates, CrashId, CrashRecord, PersonInjury, PersonRecord, PersonRole,
    VehicleCategory,
};

use crate::DatasetStore;

/// Starts a crash with the given identifier: Brooklyn, 2021-06-15 at noon,
/// one passenger vehicle, nobody hurt.
#[must_use]
pub fn crash(id: CrashId) -> CrashBuilder {
    CrashBuilder {
        record: CrashRecord {
            id,
            borough: Some(Borough::Brooklyn),
            date: ymd(2021, 6, 15),
            time: Some(hm(12, 0)),
            location: Coordinates::new(40.6782, -73.9442),
            contributing_factors: Vec::new(),
            vehicle_types: vec![VehicleCategory::PassengerVehicle],
            injured: 0,
            killed: 0,
            vehicles_involved: 1,
        },
        vehicles_involved: None,
    }
}

/// Starts an unharmed person of unknown age.
#[must_use]
pub const fn person(crash_id: CrashId, role: PersonRole) -> PersonBuilder {
    PersonBuilder {
        record: PersonRecord {
            crash_id,
            role,
            age: None,
            injury: PersonInjury::Unharmed,
        },
    }
}

#[derive(Debug, Clone)]
pub struct CrashBuilder {
    record: CrashRecord,
    vehicles_involved: Option<u32>,
}

impl CrashBuilder {
    #[must_use]
    pub const fn borough(mut self, borough: Borough) -> Self {
        self.record.borough = Some(borough);
        self
    }

    #[must_use]
    pub const fn no_borough(mut self) -> Self {
        self.record.borough = None;
        self
    }

    #[must_use]
    pub fn date(mut self, year: i32, month: u32, day: u32) -> Self {
        self.record.date = ymd(year, month, day);
        self
    }

    #[must_use]
    pub fn time(mut self, hour: u32, minute: u32) -> Self {
        self.record.time = Some(hm(hour, minute));
        self
    }

    #[must_use]
    pub const fn no_time(mut self) -> Self {
        self.record.time = None;
        self
    }

    #[must_use]
    pub fn location(mut self, latitude: f64, longitude: f64) -> Self {
        self.record.location = Coordinates::new(latitude, longitude);
        self
    }

    #[must_use]
    pub const fn no_location(mut self) -> Self {
        self.record.location = None;
        self
    }

    #[must_use]
    pub fn factors<const N: usize>(mut self, factors: [&str; N]) -> Self {
        self.record.contributing_factors = factors.iter().map(|f| (*f).to_owned()).collect();
        self
    }

    /// Sets the vehicle categories. Unless overridden with
    /// [`Self::vehicles_involved`], the vehicle count follows.
    #[must_use]
    pub fn vehicles<const N: usize>(mut self, vehicles: [VehicleCategory; N]) -> Self {
        self.record.vehicle_types = Vec::with_capacity(N);
        for vehicle in vehicles {
            if !self.record.vehicle_types.contains(&vehicle) {
                self.record.vehicle_types.push(vehicle);
            }
        }
        self.record.vehicles_involved = u32::try_from(N).unwrap_or(u32::MAX);
        self
    }

    #[must_use]
    pub const fn vehicles_involved(mut self, count: u32) -> Self {
        self.vehicles_involved = Some(count);
        self
    }

    #[must_use]
    pub const fn injured(mut self, injured: u32) -> Self {
        self.record.injured = injured;
        self
    }

    #[must_use]
    pub const fn killed(mut self, killed: u32) -> Self {
        self.record.killed = killed;
        self
    }

    #[must_use]
    pub fn build(self) -> CrashRecord {
        let mut record = self.record;
        if let Some(count) = self.vehicles_involved {
            record.vehicles_involved = count;
        }
        record
    }
}

#[derive(Debug, Clone)]
pub struct PersonBuilder {
    record: PersonRecord,
}

impl PersonBuilder {
    #[must_use]
    pub const fn age(mut self, age: u16) -> Self {
        self.record.age = Some(age);
        self
    }

    #[must_use]
    pub const fn injury(mut self, injury: PersonInjury) -> Self {
        self.record.injury = injury;
        self
    }

    #[must_use]
    pub const fn build(self) -> PersonRecord {
        self.record
    }
}

/// Seven crashes and thirteen persons spread over four boroughs, one
/// unattributed crash, and the years 2019-2023. Staten Island has no
/// crashes.
///
/// # Panics
///
/// Panics if the fixture records fail store validation.
#[must_use]
pub fn sample_store() -> DatasetStore {
    use PersonInjury::{Injured, Killed};
    use PersonRole::{Cyclist, Occupant, Pedestrian};
    use VehicleCategory::{Bicycle, Motorcycle, PassengerVehicle, SportUtilityVehicle, Taxi, Truck};

    let crashes = vec![
        crash(1)
            .borough(Borough::Brooklyn)
            .date(2020, 1, 10)
            .time(8, 30)
            .location(40.6782, -73.9442)
            .factors(["Driver Inattention/Distraction", "Unspecified"])
            .vehicles([PassengerVehicle, Bicycle])
            .injured(1)
            .build(),
        crash(2)
            .borough(Borough::Brooklyn)
            .date(2021, 7, 4)
            .time(22, 15)
            .location(40.6790, -73.9450)
            .factors(["Unsafe Speed"])
            .vehicles([PassengerVehicle])
            .killed(1)
            .build(),
        crash(3)
            .borough(Borough::Queens)
            .date(2022, 4, 12)
            .time(14, 0)
            .location(40.7282, -73.7949)
            .factors(["Driver Inattention/Distraction", "Following Too Closely"])
            .vehicles([Taxi, PassengerVehicle])
            .build(),
        crash(4)
            .borough(Borough::Queens)
            .date(2022, 10, 30)
            .time(3, 45)
            .no_location()
            .vehicles([SportUtilityVehicle, Truck, PassengerVehicle])
            .injured(2)
            .build(),
        crash(5)
            .borough(Borough::Manhattan)
            .date(2019, 12, 24)
            .time(18, 30)
            .location(40.7580, -73.9855)
            .factors(["Failure to Yield Right-of-Way"])
            .vehicles([Taxi])
            .injured(1)
            .build(),
        crash(6)
            .no_borough()
            .date(2021, 2, 14)
            .time(11, 0)
            .location(40.8448, -73.8648)
            .factors(["Unsafe Speed"])
            .vehicles([Motorcycle])
            .build(),
        crash(7)
            .borough(Borough::Bronx)
            .date(2023, 8, 1)
            .time(16, 20)
            .location(40.8448, -73.8648)
            .factors(["Alcohol Involvement"])
            .vehicles([PassengerVehicle, PassengerVehicle])
            .injured(3)
            .build(),
    ];

    let persons = vec![
        person(1, Occupant).age(34).build(),
        person(1, Cyclist).age(27).injury(Injured).build(),
        person(2, Occupant).age(45).build(),
        person(2, Pedestrian).age(71).injury(Killed).build(),
        person(3, Occupant).age(52).build(),
        person(3, Occupant).age(0).build(),
        person(4, Occupant).age(19).injury(Injured).build(),
        person(4, Occupant).injury(Injured).build(),
        person(5, Pedestrian).age(12).injury(Injured).build(),
        person(6, Occupant).age(30).build(),
        person(7, Occupant).age(40).injury(Injured).build(),
        person(7, Occupant).age(38).injury(Injured).build(),
        person(7, Pedestrian).age(66).injury(Injured).build(),
    ];

    DatasetStore::new(crashes, persons)
        .unwrap_or_else(|e| panic!("Invalid sample dataset: {e}"))
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap_or_else(|| panic!("Invalid test date {year}-{month}-{day}"))
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0)
        .unwrap_or_else(|| panic!("Invalid test time {hour}:{minute}"))
}
