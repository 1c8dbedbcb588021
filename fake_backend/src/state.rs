//! In-memory tables and test controls.

use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

pub type Record = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Students,
    Courses,
    Subjects,
    Instructors,
    Classes,
    Results,
    SubjectResults,
}

impl Collection {
    pub fn path(self) -> &'static str {
        match self {
            Collection::Students => "students",
            Collection::Courses => "courses",
            Collection::Subjects => "subjects",
            Collection::Instructors => "instructors",
            Collection::Classes => "classes",
            Collection::Results => "results",
            Collection::SubjectResults => "subject-results",
        }
    }

    /// Fields a create (or full update) must carry.
    pub(crate) fn required(self) -> &'static [&'static str] {
        match self {
            Collection::Students => &["first_name", "last_name", "id_number", "contact_number"],
            Collection::Courses => &["name"],
            Collection::Subjects => &["course", "name"],
            Collection::Instructors => &["first_name", "last_name"],
            Collection::Classes => &["course", "instructor", "course_number", "batch_number"],
            Collection::Results => &["student", "class_instance"],
            Collection::SubjectResults => &["result", "template"],
        }
    }

    pub(crate) fn defaults(self) -> Record {
        let defaults = match self {
            Collection::Subjects => json!({ "max_theory": 100, "max_practical": 100 }),
            Collection::Classes => json!({ "students": [], "start_date": null, "end_date": null }),
            Collection::SubjectResults => {
                json!({ "theory_marks": null, "practical_marks": null, "total_marks": null })
            }
            _ => json!({}),
        };
        match defaults {
            Value::Object(map) => map,
            _ => Record::new(),
        }
    }
}

#[derive(Default)]
pub(crate) struct Data {
    tables: HashMap<Collection, BTreeMap<i64, Record>>,
}

impl Data {
    pub(crate) fn table(&self, collection: Collection) -> impl Iterator<Item = &Record> {
        self.tables.get(&collection).into_iter().flat_map(|t| t.values())
    }

    pub(crate) fn get(&self, collection: Collection, id: i64) -> Option<&Record> {
        self.tables.get(&collection)?.get(&id)
    }

    pub(crate) fn get_mut(&mut self, collection: Collection, id: i64) -> Option<&mut Record> {
        self.tables.get_mut(&collection)?.get_mut(&id)
    }

    pub(crate) fn remove(&mut self, collection: Collection, id: i64) -> Option<Record> {
        self.tables.get_mut(&collection)?.remove(&id)
    }

    /// Stores `record`, allocating the next id when `id` is `None`.
    pub(crate) fn insert(&mut self, collection: Collection, id: Option<i64>, mut record: Record) -> Record {
        let table = self.tables.entry(collection).or_default();
        let id = id.unwrap_or_else(|| table.keys().next_back().map_or(1, |last| last + 1));
        record.insert("id".into(), json!(id));
        table.insert(id, record.clone());
        record
    }

    /// Creates a Result plus one empty SubjectResult per subject of the class's course.
    pub(crate) fn create_result(&mut self, student: i64, class_instance: i64) -> Record {
        let mut record = Record::new();
        record.insert("student".into(), json!(student));
        record.insert("class_instance".into(), json!(class_instance));
        let result = self.insert(Collection::Results, None, record);
        let result_id = result.get("id").and_then(Value::as_i64).unwrap_or_default();

        let course = self
            .get(Collection::Classes, class_instance)
            .and_then(|c| c.get("course"))
            .and_then(Value::as_i64);
        let templates: Vec<i64> = self
            .table(Collection::Subjects)
            .filter(|s| s.get("course").and_then(Value::as_i64) == course && course.is_some())
            .filter_map(|s| s.get("id").and_then(Value::as_i64))
            .collect();

        for template in templates {
            let mut row = Collection::SubjectResults.defaults();
            row.insert("result".into(), json!(result_id));
            row.insert("template".into(), json!(template));
            self.insert(Collection::SubjectResults, None, row);
        }
        result
    }

    pub(crate) fn find_result(&self, student: i64, class_instance: i64) -> Option<&Record> {
        self.table(Collection::Results).find(|r| {
            r.get("student").and_then(Value::as_i64) == Some(student)
                && r.get("class_instance").and_then(Value::as_i64) == Some(class_instance)
        })
    }
}

/// Knobs and counters that let tests provoke and observe specific behaviour.
#[derive(Default)]
pub(crate) struct Controls {
    pub(crate) refresh_calls: AtomicUsize,
    pub(crate) token_epoch: AtomicU64,
    pub(crate) token_serial: AtomicU64,
    pub(crate) reject_every_token: AtomicBool,
    pub(crate) fail_refresh: AtomicBool,
    pub(crate) refresh_delay_ms: AtomicU64,
    pub(crate) expired_as_forbidden: AtomicBool,
    pub(crate) get_or_create_disabled: AtomicBool,
    pub(crate) subject_result_listing_broken: AtomicBool,
    pub(crate) patch_calls: AtomicUsize,
    pub(crate) results_created: AtomicUsize,
}

pub(crate) struct Shared {
    pub(crate) data: Mutex<Data>,
    pub(crate) users: Mutex<HashMap<String, String>>,
    pub(crate) controls: Controls,
}

/// Handle to one fake backend instance. Clones share state.
#[derive(Clone)]
pub struct FakeBackend {
    pub(crate) shared: Arc<Shared>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBackend {
    /// An empty backend with a single `admin` / `admin123` account.
    pub fn new() -> Self {
        let backend = Self {
            shared: Arc::new(Shared {
                data: Mutex::new(Data::default()),
                users: Mutex::new(HashMap::new()),
                controls: Controls::default(),
            }),
        };
        backend.add_user("admin", "admin123");
        backend
    }

    pub fn add_user(&self, username: &str, password: &str) {
        self.shared
            .users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(username.into(), password.into());
    }

    pub(crate) fn data(&self) -> MutexGuard<'_, Data> {
        self.shared.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn controls(&self) -> &Controls {
        &self.shared.controls
    }

    // --- Seeding & inspection ---

    /// Inserts a record verbatim (no validation) and returns its id.
    pub fn insert(&self, collection: Collection, value: Value) -> i64 {
        self.insert_record(collection, None, value)
    }

    pub fn insert_with_id(&self, collection: Collection, id: i64, value: Value) -> i64 {
        self.insert_record(collection, Some(id), value)
    }

    fn insert_record(&self, collection: Collection, id: Option<i64>, value: Value) -> i64 {
        let mut record = collection.defaults();
        if let Value::Object(fields) = value {
            record.extend(fields);
        }
        let stored = self.data().insert(collection, id, record);
        stored.get("id").and_then(Value::as_i64).unwrap_or_default()
    }

    /// Seeds a Result and its empty SubjectResult rows, the way the backend does.
    pub fn seed_result(&self, student: i64, class_instance: i64) -> i64 {
        let record = self.data().create_result(student, class_instance);
        record.get("id").and_then(Value::as_i64).unwrap_or_default()
    }

    pub fn record(&self, collection: Collection, id: i64) -> Option<Value> {
        self.data().get(collection, id).cloned().map(Value::Object)
    }

    pub fn records(&self, collection: Collection) -> Vec<Value> {
        self.data().table(collection).cloned().map(Value::Object).collect()
    }

    pub fn remove_record(&self, collection: Collection, id: i64) -> bool {
        self.data().remove(collection, id).is_some()
    }

    /// Sets fields on a stored record directly.
    pub fn update_record(&self, collection: Collection, id: i64, value: Value) {
        let mut data = self.data();
        if let (Some(record), Value::Object(fields)) = (data.get_mut(collection, id), value) {
            record.extend(fields);
        }
    }

    // --- Controls ---

    pub fn refresh_calls(&self) -> usize {
        self.controls().refresh_calls.load(Ordering::SeqCst)
    }

    pub fn patch_calls(&self) -> usize {
        self.controls().patch_calls.load(Ordering::SeqCst)
    }

    pub fn results_created(&self) -> usize {
        self.controls().results_created.load(Ordering::SeqCst)
    }

    /// Invalidates every access token issued so far; refresh tokens stay valid.
    pub fn revoke_access_tokens(&self) {
        self.controls().token_epoch.fetch_add(1, Ordering::SeqCst);
    }

    /// When set, no access token is ever accepted, not even a freshly refreshed one.
    pub fn reject_every_token(&self, on: bool) {
        self.controls().reject_every_token.store(on, Ordering::SeqCst);
    }

    pub fn fail_refresh(&self, on: bool) {
        self.controls().fail_refresh.store(on, Ordering::SeqCst);
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        self.controls()
            .refresh_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Report invalid tokens as `403 {"code": "token_not_valid"}` instead of 401.
    pub fn expire_with_forbidden(&self, on: bool) {
        self.controls().expired_as_forbidden.store(on, Ordering::SeqCst);
    }

    /// Makes `GET /subject-results/` answer 500.
    pub fn break_subject_result_listing(&self, on: bool) {
        self.controls()
            .subject_result_listing_broken
            .store(on, Ordering::SeqCst);
    }

    /// Makes `/results/get_or_create/` answer 404, as older backends do.
    pub fn disable_get_or_create(&self, on: bool) {
        self.controls().get_or_create_disabled.store(on, Ordering::SeqCst);
    }
}
