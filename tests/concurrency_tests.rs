// Copyright 2024 Itemcast Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Integration tests for concurrent first use of the process-wide caches

use itemcast::{ExtractionMode, Mapped, Materializer, MemoryRecord, TypeDeclaration};
use std::sync::Barrier;
use std::thread;
use uuid::Uuid;

const WORKERS: usize = 16;

#[derive(Default, Debug, PartialEq, Clone)]
struct Profile {
    display_name: String,
    visits: i64,
    id: Uuid,
}

impl Mapped for Profile {
    fn declarations() -> Vec<TypeDeclaration<Self>> {
        vec![
            TypeDeclaration::new("Profile")
                .field(
                    "DisplayName",
                    ExtractionMode::Raw,
                    |p: &Profile| p.display_name.clone(),
                    |p, v| p.display_name = v,
                )
                .field(
                    "Visits",
                    ExtractionMode::Raw,
                    |p: &Profile| p.visits,
                    |p, v| p.visits = v,
                )
                .identifier("Id", |p: &Profile| p.id, |p, v| p.id = v),
        ]
    }
}

#[derive(Default, Debug, PartialEq)]
struct Badge {
    label: String,
}

impl Mapped for Badge {
    fn declarations() -> Vec<TypeDeclaration<Self>> {
        vec![TypeDeclaration::new("Badge").field(
            "Label",
            ExtractionMode::Raw,
            |b: &Badge| b.label.clone(),
            |b, v| b.label = v,
        )]
    }
}

#[test]
fn concurrent_first_use_converges_to_one_cache_entry() {
    let engine = Materializer::new();
    let id = Uuid::new_v4();
    let record = MemoryRecord::new(id)
        .with_field("DisplayName", "ada")
        .with_field("Visits", "7");
    let barrier = Barrier::new(WORKERS);

    let expected = Profile {
        display_name: "ada".to_owned(),
        visits: 7,
        id,
    };

    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(WORKERS);
        for _ in 0..WORKERS {
            handles.push(scope.spawn(|| {
                barrier.wait();
                engine.materialize::<Profile>(&record).unwrap()
            }));
        }
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });

    assert_eq!(engine.configurations().len(), 1);
    assert_eq!(engine.activators().len(), 1);
}

#[test]
fn concurrent_use_across_types_keeps_entries_separate() {
    let engine = Materializer::new();
    let profile_record = MemoryRecord::new(Uuid::new_v4())
        .with_field("DisplayName", "ada")
        .with_field("Visits", "7");
    let badge_record = MemoryRecord::new(Uuid::new_v4()).with_field("Label", "gold");
    let barrier = Barrier::new(WORKERS);

    thread::scope(|scope| {
        for worker in 0..WORKERS {
            let profile_record = &profile_record;
            let badge_record = &badge_record;
            let engine = &engine;
            let barrier = &barrier;
            scope.spawn(move || {
                barrier.wait();
                if worker % 2 == 0 {
                    let profile: Profile = engine.materialize(profile_record).unwrap();
                    assert_eq!(profile.display_name, "ada");
                } else {
                    let badge: Badge = engine.materialize(badge_record).unwrap();
                    assert_eq!(badge.label, "gold");
                }
            });
        }
    });

    assert_eq!(engine.configurations().len(), 2);
    assert_eq!(engine.activators().len(), 2);
}

#[test]
fn concurrent_warm_up_is_idempotent() {
    let engine = Materializer::new();
    let barrier = Barrier::new(WORKERS);

    thread::scope(|scope| {
        for _ in 0..WORKERS {
            let engine = &engine;
            let barrier = &barrier;
            scope.spawn(move || {
                barrier.wait();
                engine.warm_up::<Profile>().unwrap();
            });
        }
    });

    assert_eq!(engine.configurations().len(), 1);
    assert_eq!(engine.activators().len(), 1);
}

#[test]
fn activator_instances_are_independent_across_threads() {
    let engine = Materializer::new();
    engine.warm_up::<Profile>().unwrap();
    let activator = engine
        .activators()
        .get(std::any::TypeId::of::<Profile>())
        .unwrap();

    thread::scope(|scope| {
        for worker in 0..WORKERS {
            let activator = activator.clone();
            scope.spawn(move || {
                let mut profile: Profile = activator.instantiate_as().unwrap();
                profile.visits = worker as i64;
                assert_eq!(profile.visits, worker as i64);
                assert_eq!(profile.display_name, String::default());
            });
        }
    });
}
