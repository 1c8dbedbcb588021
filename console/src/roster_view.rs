use crate::cli::RosterArgs;
use anyhow::{Context, Result, anyhow, bail};
use client::ApiClient;
use roster::{MarkField, RosterError, RosterOptions, RosterWorkbench};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// One `--mark <student>:<subject>:<field>=<value>` argument.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkArg {
    pub student: i64,
    pub template: i64,
    pub field: MarkField,
    pub value: String,
}

/// The value is kept verbatim; whether it is a number is decided at save time.
pub fn parse_mark_arg(arg: &str) -> Result<MarkArg> {
    let (target, value) = arg
        .split_once('=')
        .with_context(|| format!("mark '{arg}' has no '=<value>'"))?;
    let parts: Vec<&str> = target.split(':').collect();
    let [student, template, field] = parts.as_slice() else {
        bail!("mark '{arg}' must look like <student>:<subject>:<theory|practical>=<value>");
    };
    Ok(MarkArg {
        student: student
            .trim()
            .parse()
            .with_context(|| format!("bad student id in mark '{arg}'"))?,
        template: template
            .trim()
            .parse()
            .with_context(|| format!("bad subject id in mark '{arg}'"))?,
        field: field.parse::<MarkField>().map_err(|e: String| anyhow!(e))?,
        value: value.to_string(),
    })
}

fn failed(err: RosterError) -> anyhow::Error {
    anyhow!(err.user_message())
}

pub async fn run(client: &ApiClient, args: RosterArgs, student_page_size: u32) -> Result<()> {
    // Parse everything up front so a typo costs no backend calls.
    let marks = args
        .marks
        .iter()
        .map(|arg| parse_mark_arg(arg))
        .collect::<Result<Vec<_>>>()?;

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted; cancelling roster work");
                cancel.cancel();
            }
        })
    };

    let outcome = edit(client, &args, &marks, student_page_size, cancel).await;
    interrupt.abort();
    outcome
}

async fn edit(
    client: &ApiClient,
    args: &RosterArgs,
    marks: &[MarkArg],
    student_page_size: u32,
    cancel: CancellationToken,
) -> Result<()> {
    let options = RosterOptions { student_page_size };
    let mut bench = RosterWorkbench::load(client, args.class_id, options, cancel)
        .await
        .map_err(failed)?;

    if let Some(query) = &args.search {
        println!("Available students matching '{query}':");
        for student in bench.search_available(query) {
            println!("{:>5}  {:<30} {}", student.id, student.full_name(), student.id_number);
        }
    }

    if !args.add.is_empty() {
        let added = bench.add_students(&args.add);
        let skipped = args.add.len() - added.len();
        println!("Added {} student(s), skipped {skipped}.", added.len());
    }

    for &student in &args.remove {
        bench.remove_student(student).await.map_err(failed)?;
        println!("Removed student {student}.");
    }

    for mark in marks {
        bench
            .set_mark(mark.student, mark.template, mark.field, mark.value.clone())
            .map_err(failed)?;
    }

    if args.save_roster {
        bench.save_roster().await.map_err(failed)?;
        println!("Roster saved: {} student(s).", bench.class().students.len());
    }

    if args.save_marks {
        match bench.save_marks().await {
            Ok(report) => {
                println!(
                    "Marks saved: {} row(s) updated, {} result(s) created.",
                    report.patched, report.results_created
                );
                for key in &report.unseeded {
                    println!("No marks row for result {} / subject {}; value not saved.", key.result, key.template);
                }
            }
            // The grid below already shows what the backend kept.
            Err(err @ RosterError::PartialSave { .. }) => {
                print_grid(&bench);
                return Err(failed(err));
            }
            Err(err) => return Err(failed(err)),
        }
    }

    print_grid(&bench);
    Ok(())
}

fn print_grid(bench: &RosterWorkbench) {
    let class = bench.class();
    println!();
    println!("{} ({}), {} selected", class.label(), bench.course().name, bench.selection().len());

    let mut header = format!("{:>5}  {:<28}", "id", "student");
    for template in bench.templates() {
        header.push_str(&format!(" | {:^15}", truncate(&template.name, 15)));
    }
    println!("{header}");

    let mut sub = format!("{:>5}  {:<28}", "", "");
    for _ in bench.templates() {
        sub.push_str(&format!(" | {:>7} {:>7}", "T", "P"));
    }
    println!("{sub}");

    for student in bench.selected_students() {
        let mut line = format!("{:>5}  {:<28}", student.id, truncate(&student.full_name(), 28));
        for template in bench.templates() {
            let edit = bench.edit_for(student.id, template.id);
            line.push_str(&format!(
                " | {:>7} {:>7}",
                edit.get(MarkField::Theory),
                edit.get(MarkField::Practical)
            ));
        }
        println!("{line}");
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        text.chars().take(width.saturating_sub(1)).chain(['~']).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_arg_is_split_into_its_parts() {
        let spec = parse_mark_arg("12:3:theory=78.5").unwrap();
        assert_eq!(
            spec,
            MarkArg {
                student: 12,
                template: 3,
                field: MarkField::Theory,
                value: "78.5".into(),
            }
        );
        assert_eq!(parse_mark_arg("4:1:p=").unwrap().value, "");
    }

    #[test]
    fn malformed_mark_args_are_rejected() {
        assert!(parse_mark_arg("12:3:theory").is_err());
        assert!(parse_mark_arg("12:theory=5").is_err());
        assert!(parse_mark_arg("x:3:theory=5").is_err());
        assert!(parse_mark_arg("12:3:oral=5").is_err());
    }

    #[test]
    fn long_names_are_cut_to_width() {
        assert_eq!(truncate("Mathematics", 20), "Mathematics");
        assert_eq!(truncate("Mathematics", 5), "Math~");
    }
}
