//! The editable view of one class: who is enrolled and what marks they have.

use crate::error::RosterError;
use crate::keys::MarkKey;
use crate::marks::{MarkField, MarksEdit};
use client::{ApiClient, ClientError, ListQuery};
use futures::future::join_all;
use services::Resource;
use services::class_service::{ClassInstance, ClassService};
use services::course_service::{Course, CourseService};
use services::result_service::{ResultRecord, ResultService};
use services::student_service::{Student, StudentService};
use services::subject_result_service::{SubjectResult, SubjectResultService};
use services::subject_service::{Subject, SubjectService};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_STUDENT_PAGE_SIZE: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RosterOptions {
    /// Page size used while pulling the student directory.
    pub student_page_size: u32,
}

impl Default for RosterOptions {
    fn default() -> Self {
        Self {
            student_page_size: DEFAULT_STUDENT_PAGE_SIZE,
        }
    }
}

/// Outcome of a successful [`RosterWorkbench::save_marks`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarksSaveReport {
    /// Results obtained through get-or-create during this save.
    pub results_created: usize,
    /// Marks rows patched.
    pub patched: usize,
    /// Cells with a typed mark but no backend row to put it in.
    pub unseeded: Vec<MarkKey>,
}

/// Races a backend call against the workbench's cancellation token.
async fn guarded<T, F>(cancel: &CancellationToken, call: F) -> Result<T, RosterError>
where
    F: Future<Output = Result<T, ClientError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(RosterError::Cancelled),
        result = call => result.map_err(RosterError::from),
    }
}

pub struct RosterWorkbench {
    classes: ClassService,
    results: ResultService,
    subject_results_api: SubjectResultService,
    cancel: CancellationToken,

    class: ClassInstance,
    course: Course,
    templates: Vec<Subject>,
    directory: Vec<Student>,
    selection: Vec<i64>,

    results_by_student: HashMap<i64, ResultRecord>,
    subject_results: HashMap<MarkKey, SubjectResult>,
    marks_edits: HashMap<MarkKey, MarksEdit>,
    /// Typed marks for students that have no Result yet, by (template, field).
    pending_edits: HashMap<i64, BTreeMap<(i64, MarkField), String>>,
}

impl RosterWorkbench {
    /// Pulls everything the roster screen needs, in a fixed order.
    ///
    /// Any failure aborts the whole load; a missing class is reported as
    /// [`RosterError::ClassNotFound`].
    pub async fn load(
        client: &ApiClient,
        class_id: i64,
        options: RosterOptions,
        cancel: CancellationToken,
    ) -> Result<Self, RosterError> {
        let classes = ClassService::new(client.clone());
        let results = ResultService::new(client.clone());
        let subject_results_api = SubjectResultService::new(client.clone());

        let class = match guarded(&cancel, classes.get(class_id)).await {
            Err(RosterError::Client(err)) if err.is_not_found() => {
                return Err(RosterError::ClassNotFound(class_id));
            }
            other => other?,
        };
        let course = guarded(&cancel, CourseService::new(client.clone()).get(class.course)).await?;
        let templates = guarded(&cancel, SubjectService::new(client.clone()).list_for_course(course.id)).await?;
        let directory = guarded(
            &cancel,
            StudentService::new(client.clone()).list_all(&ListQuery::new().page_size(options.student_page_size)),
        )
        .await?;
        let selection = class.students.clone();
        let existing = guarded(&cancel, results.list_for_class(class.id)).await?;
        let rows = guarded(&cancel, subject_results_api.list_for_class(class.id, None)).await?;

        let mut bench = Self {
            classes,
            results,
            subject_results_api,
            cancel,
            results_by_student: existing.into_iter().map(|r| (r.student, r)).collect(),
            class,
            course,
            templates,
            directory,
            selection,
            subject_results: HashMap::new(),
            marks_edits: HashMap::new(),
            pending_edits: HashMap::new(),
        };
        bench.rebuild_marks(rows);

        info!(
            class = bench.class.id,
            members = bench.selection.len(),
            subjects = bench.templates.len(),
            results = bench.results_by_student.len(),
            "roster loaded"
        );
        Ok(bench)
    }

    // --- Read access ---

    pub fn class(&self) -> &ClassInstance {
        &self.class
    }

    pub fn course(&self) -> &Course {
        &self.course
    }

    /// Grid columns, in backend order.
    pub fn templates(&self) -> &[Subject] {
        &self.templates
    }

    pub fn directory(&self) -> &[Student] {
        &self.directory
    }

    /// Working selection, in roster order.
    pub fn selection(&self) -> &[i64] {
        &self.selection
    }

    pub fn selected_students(&self) -> Vec<&Student> {
        self.selection.iter().filter_map(|id| self.student(*id)).collect()
    }

    pub fn student(&self, id: i64) -> Option<&Student> {
        self.directory.iter().find(|s| s.id == id)
    }

    pub fn result_for(&self, student: i64) -> Option<&ResultRecord> {
        self.results_by_student.get(&student)
    }

    pub fn subject_result(&self, key: MarkKey) -> Option<&SubjectResult> {
        self.subject_results.get(&key)
    }

    /// The cell as the operator currently sees it.
    pub fn edit_for(&self, student: i64, template: i64) -> MarksEdit {
        if let Some(result) = self.results_by_student.get(&student) {
            return self
                .marks_edits
                .get(&MarkKey::new(result.id, template))
                .cloned()
                .unwrap_or_default();
        }
        let mut edit = MarksEdit::default();
        if let Some(pending) = self.pending_edits.get(&student) {
            for field in MarkField::ALL {
                if let Some(value) = pending.get(&(template, field)) {
                    edit.set(field, value.clone());
                }
            }
        }
        edit
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    // --- Roster editing ---

    /// Directory students not on the roster whose first name, last name or id
    /// number contains `query`, ignoring case.
    pub fn search_available(&self, query: &str) -> Vec<&Student> {
        self.directory
            .iter()
            .filter(|s| !self.selection.contains(&s.id))
            .filter(|s| s.matches(query))
            .collect()
    }

    /// Appends the given students to the selection and returns the ones added.
    ///
    /// Ids already selected or missing from the directory are ignored.
    pub fn add_students(&mut self, ids: &[i64]) -> Vec<i64> {
        let mut added = Vec::new();
        for &id in ids {
            if self.selection.contains(&id) || self.student(id).is_none() {
                continue;
            }
            self.selection.push(id);
            self.reseed_student(id);
            added.push(id);
        }
        debug!(class = self.class.id, ?added, "students added to selection");
        added
    }

    /// Drops a student from the working selection along with their unsaved edits.
    pub fn deselect_student(&mut self, id: i64) -> bool {
        let Some(pos) = self.selection.iter().position(|s| *s == id) else {
            return false;
        };
        self.selection.remove(pos);
        self.pending_edits.remove(&id);
        if let Some(result) = self.results_by_student.get(&id) {
            let result_id = result.id;
            self.marks_edits.retain(|key, _| key.result != result_id);
        }
        true
    }

    /// Detaches the student on the backend, then deselects them.
    ///
    /// Students that were only added locally are just deselected.
    pub async fn remove_student(&mut self, id: i64) -> Result<(), RosterError> {
        let enrolled = self.class.students.contains(&id);
        if !enrolled && !self.selection.contains(&id) {
            return Err(RosterError::UnknownStudent(id));
        }
        if enrolled {
            guarded(&self.cancel, self.classes.remove_student(self.class.id, id)).await?;
            self.class.students.retain(|s| *s != id);
        }
        self.deselect_student(id);
        Ok(())
    }

    /// Persists the selection as the class membership (a full replace).
    ///
    /// On failure the selection is left as it was.
    pub async fn save_roster(&mut self) -> Result<(), RosterError> {
        let updated = guarded(&self.cancel, self.classes.update_students(self.class.id, &self.selection)).await?;
        self.class = updated;
        info!(class = self.class.id, members = self.selection.len(), "roster saved");
        Ok(())
    }

    // --- Marks ---

    /// Records typed text for one cell. Nothing is parsed until save.
    pub fn set_mark(
        &mut self,
        student: i64,
        template: i64,
        field: MarkField,
        value: impl Into<String>,
    ) -> Result<(), RosterError> {
        if !self.selection.contains(&student) {
            return Err(RosterError::UnknownStudent(student));
        }
        if !self.templates.iter().any(|t| t.id == template) {
            return Err(RosterError::UnknownTemplate(template));
        }

        match self.results_by_student.get(&student) {
            Some(result) => self
                .marks_edits
                .entry(MarkKey::new(result.id, template))
                .or_default()
                .set(field, value),
            None => {
                self.pending_edits
                    .entry(student)
                    .or_default()
                    .insert((template, field), value.into());
            }
        }
        Ok(())
    }

    /// Saves every changed mark of the selected students.
    ///
    /// Students without a Result get one first, and their marks rows are pulled
    /// in before any patch is planned. Patches run concurrently. Afterwards all
    /// marks are re-read from the backend even if some patches failed; any
    /// failure is reported as [`RosterError::PartialSave`], which takes
    /// precedence over a failed re-read.
    pub async fn save_marks(&mut self) -> Result<MarksSaveReport, RosterError> {
        let class_id = self.class.id;
        let mut report = MarksSaveReport::default();

        for student in self.selection.clone() {
            if self.results_by_student.contains_key(&student) {
                continue;
            }
            let result = guarded(&self.cancel, self.results.get_or_create(student, class_id)).await?;
            let rows = guarded(
                &self.cancel,
                self.subject_results_api.list_for_class(class_id, Some(result.id)),
            )
            .await?;
            debug!(student, result = result.id, rows = rows.len(), "result acquired");

            let result_id = result.id;
            self.results_by_student.insert(student, result);
            self.merge_rows(rows);
            self.fold_pending(student, result_id);
            report.results_created += 1;
        }

        let mut planned = Vec::new();
        for student in &self.selection {
            let Some(result) = self.results_by_student.get(student) else {
                continue;
            };
            for template in &self.templates {
                let key = MarkKey::new(result.id, template.id);
                let Some(edit) = self.marks_edits.get(&key) else {
                    continue;
                };
                let stored = self.subject_results.get(&key);
                let patch = edit.patch_against(stored);
                if patch.is_empty() {
                    continue;
                }
                match stored {
                    Some(row) => planned.push((key, row.id, patch)),
                    None => {
                        warn!(%key, student, "no marks row for this subject; skipping");
                        report.unseeded.push(key);
                    }
                }
            }
        }

        let total = planned.len();
        let api = &self.subject_results_api;
        let outcomes = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(RosterError::Cancelled),
            outcomes = join_all(planned.iter().map(|(_, id, patch)| api.patch(*id, patch))) => outcomes,
        };

        let mut failures = Vec::new();
        for ((key, _, _), outcome) in planned.iter().zip(outcomes) {
            if let Err(err) = outcome {
                warn!(%key, error = %err, "marks update rejected");
                failures.push(err);
            }
        }
        report.patched = total - failures.len();

        match guarded(&self.cancel, self.subject_results_api.list_for_class(class_id, None)).await {
            Ok(rows) => self.rebuild_marks(rows),
            Err(err) if failures.is_empty() => return Err(err),
            Err(err) => warn!(class = class_id, error = %err, "marks re-read failed after rejected updates"),
        }

        info!(
            class = class_id,
            created = report.results_created,
            patched = report.patched,
            failed = failures.len(),
            unseeded = report.unseeded.len(),
            "marks saved"
        );

        match failures.first() {
            None => Ok(report),
            Some(first) => Err(RosterError::PartialSave {
                failed: failures.len(),
                total,
                first_error: first.user_message(),
            }),
        }
    }

    // --- Internal bookkeeping ---

    /// Replaces the stored rows and the edit buffer with `rows`.
    fn rebuild_marks(&mut self, rows: Vec<SubjectResult>) {
        self.subject_results.clear();
        self.marks_edits.clear();
        for row in rows {
            let key = MarkKey::of(&row);
            self.marks_edits.insert(key, MarksEdit::from_row(&row));
            self.subject_results.insert(key, row);
        }
    }

    /// Adds rows without touching edits already in the buffer.
    fn merge_rows(&mut self, rows: Vec<SubjectResult>) {
        for row in rows {
            let key = MarkKey::of(&row);
            self.marks_edits
                .entry(key)
                .or_insert_with(|| MarksEdit::from_row(&row));
            self.subject_results.insert(key, row);
        }
    }

    /// Moves edits typed before the Result existed onto its keys. Typed text
    /// wins over the freshly seeded values.
    fn fold_pending(&mut self, student: i64, result_id: i64) {
        let Some(pending) = self.pending_edits.remove(&student) else {
            return;
        };
        for ((template, field), value) in pending {
            self.marks_edits
                .entry(MarkKey::new(result_id, template))
                .or_default()
                .set(field, value);
        }
    }

    /// Restores the buffer for a re-added student from the stored rows.
    fn reseed_student(&mut self, student: i64) {
        let Some(result) = self.results_by_student.get(&student) else {
            return;
        };
        for template in &self.templates {
            let key = MarkKey::new(result.id, template.id);
            if let Some(row) = self.subject_results.get(&key) {
                self.marks_edits
                    .entry(key)
                    .or_insert_with(|| MarksEdit::from_row(row));
            }
        }
    }
}
