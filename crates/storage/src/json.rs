// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON file-based course store
//!
//! Layout: `<base>/courses/<id>.json`, one file per course. Updates take an
//! exclusive lock on `<base>/courses/<id>.lock` and replace the course file
//! via write-to-temp plus rename, so readers never observe a torn write.

use crate::store::{CourseStore, StoreError};
use cu_core::{Course, CourseId};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

const COURSES_DIR: &str = "courses";

/// Course store backed by one JSON file per course
#[derive(Clone, Debug)]
pub struct JsonCourseStore {
    base_path: PathBuf,
}

impl JsonCourseStore {
    /// Open a store at the given path, creating it if needed
    pub fn open(base_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let base_path = base_path.into();
        fs::create_dir_all(base_path.join(COURSES_DIR))?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Check if a course exists
    pub fn exists(&self, id: CourseId) -> bool {
        self.path_for(id).exists()
    }

    /// Remove a course's JSON file; its write-guard file is kept
    pub fn delete(&self, id: CourseId) -> Result<(), StoreError> {
        let _guard = self.lock_course(id)?;
        let path = self.path_for(id);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }

    fn courses_dir(&self) -> PathBuf {
        self.base_path.join(COURSES_DIR)
    }

    fn path_for(&self, id: CourseId) -> PathBuf {
        self.courses_dir().join(format!("{}.json", id))
    }

    fn lock_path_for(&self, id: CourseId) -> PathBuf {
        self.courses_dir().join(format!("{}.lock", id))
    }

    fn lock_course(&self, id: CourseId) -> Result<CourseGuard, StoreError> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path_for(id))?;
        file.lock_exclusive()?;
        Ok(CourseGuard { file })
    }

    fn read(&self, id: CourseId) -> Result<Course, StoreError> {
        let path = self.path_for(id);
        if !path.exists() {
            return Err(StoreError::NotFound(id));
        }
        let json = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&json)?)
    }

    fn write(&self, course: &Course) -> Result<(), StoreError> {
        let path = self.path_for(course.id);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(course)?;
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// Holds a course's lock file until dropped
struct CourseGuard {
    file: File,
}

impl Drop for CourseGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

impl CourseStore for JsonCourseStore {
    fn list(&self) -> Result<Vec<Course>, StoreError> {
        let dir = self.courses_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut courses = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                let parsed = fs::read_to_string(&path)
                    .map_err(StoreError::from)
                    .and_then(|json| serde_json::from_str::<Course>(&json).map_err(StoreError::from));
                match parsed {
                    Ok(course) => courses.push(course),
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "skipping unreadable course file");
                    }
                }
            }
        }
        courses.sort_by_key(|c| c.id);
        Ok(courses)
    }

    fn get(&self, id: CourseId) -> Result<Course, StoreError> {
        self.read(id)
    }

    fn put(&self, course: &Course) -> Result<(), StoreError> {
        let _guard = self.lock_course(course.id)?;
        self.write(course)
    }

    fn update<R, F>(&self, id: CourseId, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut Course) -> R,
    {
        let _guard = self.lock_course(id)?;
        let mut course = self.read(id)?;
        let result = f(&mut course);
        self.write(&course)?;
        Ok(result)
    }
}

#[cfg(test)]
#[path = "json_tests.rs"]
mod tests;
