use crate::cli::{
    ClassCommand, ClassFields, CourseCommand, InstructorCommand, InstructorFields, ListArgs, StudentCommand,
    SubjectCommand,
};
use anyhow::{Context, Result};
use client::{ApiClient, ClientError, ListQuery, Page};
use services::Resource;
use services::class_service::{ClassInstance, ClassPayload, ClassService};
use services::course_service::{Course, CourseService, CreateCourse, UpdateCourse};
use services::dashboard::dashboard_counts;
use services::instructor_service::{
    CreateInstructor, Instructor, InstructorService, SignatureUpload, UpdateInstructor,
};
use services::student_service::{CreateStudent, Student, StudentService, UpdateStudent};
use services::subject_service::{CreateSubject, Subject, SubjectService, UpdateSubject};
use std::path::Path;

/// Turns a client error into the operator-facing line.
pub fn report(err: ClientError) -> anyhow::Error {
    anyhow::anyhow!(err.user_message())
}

/// One line per record in list output.
trait Row {
    fn row(&self) -> String;
}

impl Row for Student {
    fn row(&self) -> String {
        format!(
            "{:>5}  {:<30} {:<15} {}",
            self.id,
            self.full_name(),
            self.id_number,
            self.contact_number.as_deref().unwrap_or("-")
        )
    }
}

impl Row for Course {
    fn row(&self) -> String {
        format!(
            "{:>5}  {:<30} grade {:<6} price {}",
            self.id,
            self.name,
            self.grade.as_deref().unwrap_or("-"),
            self.price.as_deref().unwrap_or("-")
        )
    }
}

impl Row for Subject {
    fn row(&self) -> String {
        format!(
            "{:>5}  {:<30} course {:<5} max {}/{}",
            self.id, self.name, self.course, self.max_theory, self.max_practical
        )
    }
}

impl Row for Instructor {
    fn row(&self) -> String {
        format!(
            "{:>5}  {:<30} PSIRA {:<12} signature {}",
            self.id,
            self.full_name(),
            self.psira_number.as_deref().unwrap_or("-"),
            self.signature.as_deref().unwrap_or("-")
        )
    }
}

impl Row for ClassInstance {
    fn row(&self) -> String {
        let date = |d: Option<chrono::NaiveDate>| d.map(|d| d.to_string()).unwrap_or_else(|| "-".into());
        format!(
            "{:>5}  {:<24} course {:<5} instructor {:<5} {} .. {}  ({} students)",
            self.id,
            self.label(),
            self.course,
            self.instructor,
            date(self.start_date),
            date(self.end_date),
            self.students.len()
        )
    }
}

fn query(args: &ListArgs) -> ListQuery {
    let mut query = ListQuery::new();
    if let Some(search) = &args.search {
        query = query.search(search.clone());
    }
    if let Some(page) = args.page {
        query = query.page(page);
    }
    if let Some(size) = args.page_size {
        query = query.page_size(size);
    }
    query
}

fn print_page<T: Row>(page: &Page<T>) {
    for item in &page.results {
        println!("{}", item.row());
    }
    let more = if page.has_next() { ", more pages follow" } else { "" };
    println!("-- {} of {} shown{more}", page.results.len(), page.count);
}

async fn list<R: Resource>(service: &R, query: &ListQuery) -> Result<()>
where
    R::Model: Row,
{
    let page = service.list(query).await.map_err(report)?;
    print_page(&page);
    Ok(())
}

async fn delete<R: Resource>(service: &R, id: i64) -> Result<()> {
    service.delete(id).await.map_err(report)?;
    println!("Deleted {id}.");
    Ok(())
}

pub async fn dashboard(client: &ApiClient) -> Result<()> {
    let counts = dashboard_counts(client).await.map_err(report)?;
    println!("Students     {}", counts.students);
    println!("Courses      {}", counts.courses);
    println!("Instructors  {}", counts.instructors);
    println!("Classes      {}", counts.classes);
    Ok(())
}

pub async fn students(client: &ApiClient, cmd: StudentCommand) -> Result<()> {
    let service = StudentService::new(client.clone());
    match cmd {
        StudentCommand::List(args) => list(&service, &query(&args)).await,
        StudentCommand::Create(fields) => {
            let payload = CreateStudent {
                first_name: fields.first_name.unwrap_or_default(),
                second_name: fields.second_name,
                last_name: fields.last_name.unwrap_or_default(),
                id_number: fields.id_number.unwrap_or_default(),
                contact_number: fields.contact_number.unwrap_or_default(),
            };
            let student = service.create(&payload).await.map_err(report)?;
            println!("{}", student.row());
            Ok(())
        }
        StudentCommand::Update { id, fields } => {
            let payload = UpdateStudent {
                first_name: fields.first_name,
                second_name: fields.second_name,
                last_name: fields.last_name,
                id_number: fields.id_number,
                contact_number: fields.contact_number,
            };
            let student = service.update(id, &payload).await.map_err(report)?;
            println!("{}", student.row());
            Ok(())
        }
        StudentCommand::Delete { id } => delete(&service, id).await,
    }
}

pub async fn courses(client: &ApiClient, cmd: CourseCommand) -> Result<()> {
    let service = CourseService::new(client.clone());
    match cmd {
        CourseCommand::List(args) => list(&service, &query(&args)).await,
        CourseCommand::Create(fields) => {
            let payload = CreateCourse {
                name: fields.name.unwrap_or_default(),
                grade: fields.grade,
                description: fields.description,
                price: fields.price,
            };
            let course = service.create(&payload).await.map_err(report)?;
            println!("{}", course.row());
            Ok(())
        }
        CourseCommand::Update { id, fields } => {
            let payload = UpdateCourse {
                name: fields.name,
                grade: fields.grade,
                description: fields.description,
                price: fields.price,
            };
            let course = service.update(id, &payload).await.map_err(report)?;
            println!("{}", course.row());
            Ok(())
        }
        CourseCommand::Delete { id } => delete(&service, id).await,
    }
}

pub async fn subjects(client: &ApiClient, cmd: SubjectCommand) -> Result<()> {
    let service = SubjectService::new(client.clone());
    match cmd {
        SubjectCommand::List { course, list: args } => {
            let mut query = query(&args);
            if let Some(course) = course {
                query = query.filter("course", course);
            }
            list(&service, &query).await
        }
        SubjectCommand::Create(fields) => {
            let course = fields.course.context("--course is required")?;
            let mut payload = CreateSubject::new(course, fields.name.unwrap_or_default());
            if let Some(max) = fields.max_theory {
                payload.max_theory = max;
            }
            if let Some(max) = fields.max_practical {
                payload.max_practical = max;
            }
            let subject = service.create(&payload).await.map_err(report)?;
            println!("{}", subject.row());
            Ok(())
        }
        SubjectCommand::Update { id, fields } => {
            let payload = UpdateSubject {
                course: fields.course,
                name: fields.name,
                max_theory: fields.max_theory,
                max_practical: fields.max_practical,
            };
            let subject = service.update(id, &payload).await.map_err(report)?;
            println!("{}", subject.row());
            Ok(())
        }
        SubjectCommand::Delete { id } => delete(&service, id).await,
    }
}

async fn read_signature(path: &Path) -> Result<SignatureUpload> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("cannot read signature file {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .context("signature path has no file name")?;
    let mime = match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
        Some("png") => Some("image/png".to_string()),
        Some("jpg" | "jpeg") => Some("image/jpeg".to_string()),
        Some("gif") => Some("image/gif".to_string()),
        _ => None,
    };
    Ok(SignatureUpload { file_name, mime, bytes })
}

async fn signature(fields: &InstructorFields) -> Result<Option<SignatureUpload>> {
    match &fields.signature {
        Some(path) => read_signature(path).await.map(Some),
        None => Ok(None),
    }
}

pub async fn instructors(client: &ApiClient, cmd: InstructorCommand) -> Result<()> {
    let service = InstructorService::new(client.clone());
    match cmd {
        InstructorCommand::List(args) => list(&service, &query(&args)).await,
        InstructorCommand::Create(fields) => {
            let signature = signature(&fields).await?;
            let payload = CreateInstructor {
                first_name: fields.first_name.unwrap_or_default(),
                last_name: fields.last_name.unwrap_or_default(),
                psira_number: fields.psira_number,
                contact_number: fields.contact_number,
                signature,
            };
            let instructor = service.create(&payload).await.map_err(report)?;
            println!("{}", instructor.row());
            Ok(())
        }
        InstructorCommand::Update { id, fields } => {
            let signature = signature(&fields).await?;
            let payload = UpdateInstructor {
                first_name: fields.first_name,
                last_name: fields.last_name,
                psira_number: fields.psira_number,
                contact_number: fields.contact_number,
                signature,
            };
            let instructor = service.update(id, &payload).await.map_err(report)?;
            println!("{}", instructor.row());
            Ok(())
        }
        InstructorCommand::Delete { id } => delete(&service, id).await,
    }
}

/// Fields given on the command line replace those of `base`.
fn class_payload(base: ClassPayload, fields: ClassFields) -> ClassPayload {
    ClassPayload {
        course: fields.course.unwrap_or(base.course),
        instructor: fields.instructor.unwrap_or(base.instructor),
        course_number: fields.course_number.unwrap_or(base.course_number),
        batch_number: fields.batch_number.unwrap_or(base.batch_number),
        start_date: fields.start_date.or(base.start_date),
        end_date: fields.end_date.or(base.end_date),
        students: base.students,
    }
}

pub async fn classes(client: &ApiClient, cmd: ClassCommand) -> Result<()> {
    let service = ClassService::new(client.clone());
    match cmd {
        ClassCommand::List(args) => list(&service, &query(&args)).await,
        ClassCommand::Create(fields) => {
            let base = ClassPayload {
                course: fields.course.context("--course is required")?,
                instructor: fields.instructor.context("--instructor is required")?,
                course_number: String::new(),
                batch_number: String::new(),
                start_date: None,
                end_date: None,
                students: Vec::new(),
            };
            let payload = class_payload(base, fields);
            let class = service.create(&payload).await.map_err(report)?;
            println!("{}", class.row());
            Ok(())
        }
        ClassCommand::Update { id, fields } => {
            // Full replace: start from what the backend holds.
            let current = service.get(id).await.map_err(report)?;
            let payload = class_payload(ClassPayload::from(&current), fields);
            let class = service.update(id, &payload).await.map_err(report)?;
            println!("{}", class.row());
            Ok(())
        }
        ClassCommand::Delete { id } => delete(&service, id).await,
    }
}
