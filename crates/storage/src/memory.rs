// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory course store

use crate::store::{CourseStore, StoreError};
use cu_core::{Course, CourseId};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Course store backed by a shared map
#[derive(Clone, Debug, Default)]
pub struct MemoryCourseStore {
    courses: Arc<Mutex<BTreeMap<CourseId, Course>>>,
}

impl MemoryCourseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_courses(courses: impl IntoIterator<Item = Course>) -> Self {
        let store = Self::new();
        {
            let mut map = store.courses.lock().unwrap_or_else(|e| e.into_inner());
            for course in courses {
                map.insert(course.id, course);
            }
        }
        store
    }

    pub fn len(&self) -> usize {
        self.courses.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CourseStore for MemoryCourseStore {
    fn list(&self) -> Result<Vec<Course>, StoreError> {
        let courses = self.courses.lock().unwrap_or_else(|e| e.into_inner());
        Ok(courses.values().cloned().collect())
    }

    fn get(&self, id: CourseId) -> Result<Course, StoreError> {
        let courses = self.courses.lock().unwrap_or_else(|e| e.into_inner());
        courses.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    fn put(&self, course: &Course) -> Result<(), StoreError> {
        let mut courses = self.courses.lock().unwrap_or_else(|e| e.into_inner());
        courses.insert(course.id, course.clone());
        Ok(())
    }

    fn update<R, F>(&self, id: CourseId, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut Course) -> R,
    {
        let mut courses = self.courses.lock().unwrap_or_else(|e| e.into_inner());
        let course = courses.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        Ok(f(course))
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
