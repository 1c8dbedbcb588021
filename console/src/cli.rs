use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "backoffice", version, about = "Training-institute back-office console")]
pub struct Cli {
    /// Backend origin; overrides API_BASE
    #[arg(long, global = true)]
    pub api_base: Option<String>,
    /// Token file; overrides SESSION_FILE
    #[arg(long, global = true)]
    pub session_file: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Obtain and store a token pair
    Login {
        #[arg(long, short)]
        username: String,
        #[arg(long, short, env = "BACKOFFICE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored token pair
    Logout,
    /// Show whether a session is stored
    Status,
    /// Collection counts
    Dashboard,
    #[command(subcommand)]
    Students(StudentCommand),
    #[command(subcommand)]
    Courses(CourseCommand),
    #[command(subcommand)]
    Subjects(SubjectCommand),
    #[command(subcommand)]
    Instructors(InstructorCommand),
    #[command(subcommand)]
    Classes(ClassCommand),
    /// Edit a class roster and its marks
    Roster(RosterArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    #[arg(long)]
    pub search: Option<String>,
    #[arg(long)]
    pub page: Option<u32>,
    #[arg(long)]
    pub page_size: Option<u32>,
}

#[derive(Args, Debug)]
pub struct StudentFields {
    #[arg(long)]
    pub first_name: Option<String>,
    #[arg(long)]
    pub second_name: Option<String>,
    #[arg(long)]
    pub last_name: Option<String>,
    #[arg(long)]
    pub id_number: Option<String>,
    #[arg(long)]
    pub contact_number: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum StudentCommand {
    List(ListArgs),
    Create(StudentFields),
    Update {
        id: i64,
        #[command(flatten)]
        fields: StudentFields,
    },
    Delete {
        id: i64,
    },
}

#[derive(Args, Debug)]
pub struct CourseFields {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub grade: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub price: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum CourseCommand {
    List(ListArgs),
    Create(CourseFields),
    Update {
        id: i64,
        #[command(flatten)]
        fields: CourseFields,
    },
    Delete {
        id: i64,
    },
}

#[derive(Args, Debug)]
pub struct SubjectFields {
    #[arg(long)]
    pub course: Option<i64>,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub max_theory: Option<f64>,
    #[arg(long)]
    pub max_practical: Option<f64>,
}

#[derive(Subcommand, Debug)]
pub enum SubjectCommand {
    List {
        /// Only subjects of this course
        #[arg(long)]
        course: Option<i64>,
        #[command(flatten)]
        list: ListArgs,
    },
    Create(SubjectFields),
    Update {
        id: i64,
        #[command(flatten)]
        fields: SubjectFields,
    },
    Delete {
        id: i64,
    },
}

#[derive(Args, Debug)]
pub struct InstructorFields {
    #[arg(long)]
    pub first_name: Option<String>,
    #[arg(long)]
    pub last_name: Option<String>,
    #[arg(long)]
    pub psira_number: Option<String>,
    #[arg(long)]
    pub contact_number: Option<String>,
    /// Image file uploaded as the signature
    #[arg(long)]
    pub signature: Option<std::path::PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum InstructorCommand {
    List(ListArgs),
    Create(InstructorFields),
    Update {
        id: i64,
        #[command(flatten)]
        fields: InstructorFields,
    },
    Delete {
        id: i64,
    },
}

#[derive(Args, Debug)]
pub struct ClassFields {
    #[arg(long)]
    pub course: Option<i64>,
    #[arg(long)]
    pub instructor: Option<i64>,
    #[arg(long)]
    pub course_number: Option<String>,
    #[arg(long)]
    pub batch_number: Option<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    pub start_date: Option<NaiveDate>,
    /// YYYY-MM-DD
    #[arg(long)]
    pub end_date: Option<NaiveDate>,
}

#[derive(Subcommand, Debug)]
pub enum ClassCommand {
    List(ListArgs),
    Create(ClassFields),
    Update {
        id: i64,
        #[command(flatten)]
        fields: ClassFields,
    },
    Delete {
        id: i64,
    },
}

#[derive(Args, Debug)]
pub struct RosterArgs {
    pub class_id: i64,
    /// Student to add to the selection (repeatable)
    #[arg(long = "add", value_name = "STUDENT")]
    pub add: Vec<i64>,
    /// Student to detach from the class (repeatable)
    #[arg(long = "remove", value_name = "STUDENT")]
    pub remove: Vec<i64>,
    /// <student>:<subject>:<theory|practical>=<value> (repeatable)
    #[arg(long = "mark", value_name = "SPEC")]
    pub marks: Vec<String>,
    /// List directory students not on the roster that match
    #[arg(long)]
    pub search: Option<String>,
    /// Persist the selection as the class membership
    #[arg(long)]
    pub save_roster: bool,
    /// Persist changed marks
    #[arg(long)]
    pub save_marks: bool,
}
