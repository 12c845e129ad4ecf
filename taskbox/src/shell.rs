//! Line-oriented command shell over the stores.
//!
//! [`Command::parse`] turns one input line into a [`Command`];
//! [`Shell::execute`] runs it against a [`StoreRegistry`] and renders the
//! result as text. The binary is a thin stdin loop around the two.

use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use taskbox_proto::{
    NewProject, NewTask, Project, ProjectId, ProjectPatch, Task, TaskError, TaskId, TaskPatch,
};

use crate::mail::html::html_to_text;
use crate::mail::snooze::{MailError, MemoryMailbox, SnoozeScheduler};
use crate::projects::ProjectError;
use crate::registry::StoreRegistry;

/// Shell command reference, printed by `help`.
pub const HELP: &str = "\
task add <title>                 create a task
task done <task-id>              toggle completion
task edit <task-id> <title>      rename a task
task rm <task-id>                delete a task
task list                        list all tasks
project add <title>              create and select a project
project edit <id> <title>        rename a project
project complete|reopen <id>     set the completion flag
project rm <id>                  delete a project
project select <id>|none         change the selected project
project show [id]                show a project with its tasks
project list                     list all projects
project link <id> <task-id>      add a task to a project
project unlink <id> <task-id>    remove a task from a project
mail add <message-id>            deliver a message to the inbox
mail snooze <message-id> <mins>  hide a message for a while
mail poll                        wake messages that are due
mail html <markup>               convert an HTML body to text
help                             show this list
quit                             flush and exit";

/// Errors produced while parsing or running a shell command.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    /// The line held no command.
    #[error("empty command")]
    Empty,

    /// The command word is not recognized.
    #[error("unknown command: {0} (try `help`)")]
    Unknown(String),

    /// The command was recognized but its arguments were wrong.
    #[error("usage: {0}")]
    Usage(&'static str),

    /// A numeric argument did not parse.
    #[error("not a number: {0}")]
    InvalidNumber(String),

    /// No task has the given id.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// Task construction failed.
    #[error(transparent)]
    Task(#[from] TaskError),

    /// A project operation failed.
    #[error(transparent)]
    Project(#[from] ProjectError),

    /// The mailbox rejected an operation.
    #[error(transparent)]
    Mail(#[from] MailError),
}

/// One parsed shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    TaskAdd { title: String },
    TaskDone { id: TaskId },
    TaskEdit { id: TaskId, title: String },
    TaskRemove { id: TaskId },
    TaskList,
    ProjectAdd { title: String },
    ProjectEdit { id: ProjectId, title: String },
    ProjectComplete { id: ProjectId, is_completed: bool },
    ProjectRemove { id: ProjectId },
    ProjectSelect { id: Option<ProjectId> },
    ProjectShow { id: Option<ProjectId> },
    ProjectList,
    ProjectLink { project: ProjectId, task: TaskId },
    ProjectUnlink { project: ProjectId, task: TaskId },
    MailAdd { message_id: String },
    MailSnooze { message_id: String, minutes: u32 },
    MailPoll,
    MailHtml { html: String },
    Help,
    Quit,
}

impl Command {
    /// Parses one input line.
    ///
    /// Titles and HTML take the rest of the line with inner whitespace
    /// collapsed to single spaces.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError`] for blank lines, unknown commands and bad
    /// arguments.
    pub fn parse(line: &str) -> Result<Self, ShellError> {
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            [] => Err(ShellError::Empty),
            ["help"] => Ok(Self::Help),
            ["quit" | "exit"] => Ok(Self::Quit),
            ["task", rest @ ..] => Self::parse_task(rest),
            ["project", rest @ ..] => Self::parse_project(rest),
            ["mail", rest @ ..] => Self::parse_mail(rest),
            [other, ..] => Err(ShellError::Unknown((*other).to_string())),
        }
    }

    fn parse_task(words: &[&str]) -> Result<Self, ShellError> {
        match words {
            ["add", title @ ..] if !title.is_empty() => Ok(Self::TaskAdd {
                title: title.join(" "),
            }),
            ["add", ..] => Err(ShellError::Usage("task add <title>")),
            ["done", id] => Ok(Self::TaskDone { id: (*id).into() }),
            ["done", ..] => Err(ShellError::Usage("task done <task-id>")),
            ["edit", id, title @ ..] if !title.is_empty() => Ok(Self::TaskEdit {
                id: (*id).into(),
                title: title.join(" "),
            }),
            ["edit", ..] => Err(ShellError::Usage("task edit <task-id> <title>")),
            ["rm", id] => Ok(Self::TaskRemove { id: (*id).into() }),
            ["rm", ..] => Err(ShellError::Usage("task rm <task-id>")),
            ["list"] => Ok(Self::TaskList),
            [other, ..] => Err(ShellError::Unknown(format!("task {other}"))),
            [] => Err(ShellError::Usage("task add|done|edit|rm|list")),
        }
    }

    fn parse_project(words: &[&str]) -> Result<Self, ShellError> {
        match words {
            ["add", title @ ..] if !title.is_empty() => Ok(Self::ProjectAdd {
                title: title.join(" "),
            }),
            ["add", ..] => Err(ShellError::Usage("project add <title>")),
            ["edit", id, title @ ..] if !title.is_empty() => Ok(Self::ProjectEdit {
                id: (*id).into(),
                title: title.join(" "),
            }),
            ["edit", ..] => Err(ShellError::Usage("project edit <id> <title>")),
            ["complete", id] => Ok(Self::ProjectComplete {
                id: (*id).into(),
                is_completed: true,
            }),
            ["reopen", id] => Ok(Self::ProjectComplete {
                id: (*id).into(),
                is_completed: false,
            }),
            ["complete" | "reopen", ..] => Err(ShellError::Usage("project complete|reopen <id>")),
            ["rm", id] => Ok(Self::ProjectRemove { id: (*id).into() }),
            ["rm", ..] => Err(ShellError::Usage("project rm <id>")),
            ["select", "none"] => Ok(Self::ProjectSelect { id: None }),
            ["select", id] => Ok(Self::ProjectSelect {
                id: Some((*id).into()),
            }),
            ["select", ..] => Err(ShellError::Usage("project select <id>|none")),
            ["show"] => Ok(Self::ProjectShow { id: None }),
            ["show", id] => Ok(Self::ProjectShow {
                id: Some((*id).into()),
            }),
            ["list"] => Ok(Self::ProjectList),
            ["link", project, task] => Ok(Self::ProjectLink {
                project: (*project).into(),
                task: (*task).into(),
            }),
            ["unlink", project, task] => Ok(Self::ProjectUnlink {
                project: (*project).into(),
                task: (*task).into(),
            }),
            ["link" | "unlink", ..] => Err(ShellError::Usage("project link|unlink <id> <task-id>")),
            [other, ..] => Err(ShellError::Unknown(format!("project {other}"))),
            [] => Err(ShellError::Usage(
                "project add|edit|complete|reopen|rm|select|show|list|link|unlink",
            )),
        }
    }

    fn parse_mail(words: &[&str]) -> Result<Self, ShellError> {
        match words {
            ["add", id] => Ok(Self::MailAdd {
                message_id: (*id).to_string(),
            }),
            ["add", ..] => Err(ShellError::Usage("mail add <message-id>")),
            ["snooze", id, minutes] => {
                let minutes = minutes
                    .parse()
                    .map_err(|_| ShellError::InvalidNumber((*minutes).to_string()))?;
                Ok(Self::MailSnooze {
                    message_id: (*id).to_string(),
                    minutes,
                })
            }
            ["snooze", ..] => Err(ShellError::Usage("mail snooze <message-id> <mins>")),
            ["poll"] => Ok(Self::MailPoll),
            ["html", html @ ..] if !html.is_empty() => Ok(Self::MailHtml {
                html: html.join(" "),
            }),
            ["html", ..] => Err(ShellError::Usage("mail html <markup>")),
            [other, ..] => Err(ShellError::Unknown(format!("mail {other}"))),
            [] => Err(ShellError::Usage("mail add|snooze|poll|html")),
        }
    }
}

/// Runs parsed commands against the stores and the mailbox.
pub struct Shell {
    registry: StoreRegistry,
    mailbox: Arc<MemoryMailbox>,
    snooze: Arc<SnoozeScheduler<MemoryMailbox>>,
    max_title_len: usize,
}

impl Shell {
    /// Builds a shell over `registry`, restoring the snooze schedule from
    /// the registry's storage.
    pub async fn new(registry: StoreRegistry, max_title_len: usize) -> Self {
        let mailbox = Arc::new(MemoryMailbox::new());
        let snooze = Arc::new(SnoozeScheduler::load(Arc::clone(&mailbox), registry.storage()).await);
        Self {
            registry,
            mailbox,
            snooze,
            max_title_len,
        }
    }

    /// The stores this shell operates on.
    #[must_use]
    pub const fn registry(&self) -> &StoreRegistry {
        &self.registry
    }

    /// The snooze scheduler, for spawning the background poller.
    #[must_use]
    pub const fn snooze(&self) -> &Arc<SnoozeScheduler<MemoryMailbox>> {
        &self.snooze
    }

    /// Waits until every pending write has reached storage.
    pub async fn flush(&self) {
        self.registry.flush().await;
        self.snooze.flush().await;
    }

    /// Executes one command and returns its printable output.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError`] when the command names something that does not
    /// exist or its input is rejected.
    pub async fn execute(&self, command: Command) -> Result<String, ShellError> {
        let tasks = &self.registry.tasks;
        let projects = &self.registry.projects;
        match command {
            Command::TaskAdd { title } => {
                let task = NewTask::titled(title).build(self.max_title_len)?;
                let line = format_task(&task);
                tasks.add_task(task);
                Ok(line)
            }
            Command::TaskDone { id } => {
                if !tasks.toggle_task_completion(&id) {
                    return Err(ShellError::TaskNotFound(id));
                }
                tasks
                    .get_task(&id)
                    .map(|t| format_task(&t))
                    .ok_or(ShellError::TaskNotFound(id))
            }
            Command::TaskEdit { id, title } => {
                NewTask::titled(title.as_str()).build(self.max_title_len)?;
                if tasks.update_task(&id, &TaskPatch::title(title)) {
                    Ok(format!("renamed {id}"))
                } else {
                    Err(ShellError::TaskNotFound(id))
                }
            }
            Command::TaskRemove { id } => {
                if tasks.delete_task(&id) {
                    Ok(format!("deleted {id}"))
                } else {
                    Err(ShellError::TaskNotFound(id))
                }
            }
            Command::TaskList => Ok(render_lines(tasks.all_tasks().iter().map(format_task))),
            Command::ProjectAdd { title } => {
                let project = projects.add_project(NewProject::titled(title));
                Ok(format_project(&project, true))
            }
            Command::ProjectEdit { id, title } => {
                self.update_project(id, &ProjectPatch::title(title)).await
            }
            Command::ProjectComplete { id, is_completed } => {
                self.update_project(id, &ProjectPatch::completed(is_completed))
                    .await
            }
            Command::ProjectRemove { id } => {
                if projects.delete_project(&id) {
                    Ok(format!("deleted {id}"))
                } else {
                    Err(ProjectError::NotFound(id).into())
                }
            }
            Command::ProjectSelect { id } => {
                if let Some(id) = &id {
                    projects.get_project(id)?;
                }
                let line = id
                    .as_ref()
                    .map_or_else(|| "no project selected".to_string(), |id| format!("selected {id}"));
                projects.set_selected_project(id);
                Ok(line)
            }
            Command::ProjectShow { id } => {
                let id = id
                    .or_else(|| projects.selected_project_id())
                    .ok_or(ShellError::Usage("project show <id> (no project selected)"))?;
                let view = projects
                    .get_project_with_tasks(&id)
                    .ok_or(ProjectError::NotFound(id))?;
                let selected = projects.selected_project_id().as_ref() == Some(&view.project.id);
                let lines: Vec<String> = std::iter::once(format_project(&view.project, selected))
                    .chain(view.tasks.iter().map(|t| format!("  {}", format_task(t))))
                    .collect();
                Ok(lines.join("\n"))
            }
            Command::ProjectList => {
                let selected = projects.selected_project_id();
                Ok(render_lines(
                    projects
                        .get_all_projects()
                        .iter()
                        .map(|p| format_project(p, selected.as_ref() == Some(&p.id))),
                ))
            }
            Command::ProjectLink { project, task } => {
                if projects.add_task_to_project(&project, &task) {
                    Ok(format!("linked {task} to {project}"))
                } else {
                    Err(ProjectError::NotFound(project).into())
                }
            }
            Command::ProjectUnlink { project, task } => {
                if projects.remove_task_from_project(&project, &task) {
                    Ok(format!("unlinked {task} from {project}"))
                } else {
                    Err(ProjectError::NotFound(project).into())
                }
            }
            Command::MailAdd { message_id } => {
                self.mailbox.deliver(&message_id);
                Ok(format!("delivered {message_id}"))
            }
            Command::MailSnooze {
                message_id,
                minutes,
            } => {
                let until = Utc::now() + TimeDelta::minutes(i64::from(minutes));
                self.snooze.snooze(&message_id, until).await?;
                Ok(format!("snoozed {message_id} until {}", until.to_rfc3339()))
            }
            Command::MailPoll => {
                let woken = self.snooze.poll_once(Utc::now()).await;
                Ok(format!("{woken} message(s) returned to inbox"))
            }
            Command::MailHtml { html } => Ok(html_to_text(&html)),
            Command::Help => Ok(HELP.to_string()),
            Command::Quit => Ok("bye".to_string()),
        }
    }

    async fn update_project(&self, id: ProjectId, patch: &ProjectPatch) -> Result<String, ShellError> {
        let projects = &self.registry.projects;
        if !projects.update_project(&id, patch).await {
            return Err(ProjectError::NotFound(id).into());
        }
        let project = projects.get_project(&id)?;
        let selected = projects.selected_project_id().as_ref() == Some(&id);
        Ok(format_project(&project, selected))
    }
}

fn format_task(task: &Task) -> String {
    let mark = if task.is_completed { 'x' } else { ' ' };
    format!("[{mark}] {}  {}", task.id, task.title)
}

fn format_project(project: &Project, selected: bool) -> String {
    let marker = if selected { '*' } else { ' ' };
    format!(
        "{marker} {}  {} ({}, {} task(s))",
        project.id,
        project.title,
        project.status(),
        project.task_ids.len()
    )
}

fn render_lines(lines: impl Iterator<Item = String>) -> String {
    let out: Vec<String> = lines.collect();
    if out.is_empty() {
        "(none)".to_string()
    } else {
        out.join("\n")
    }
}
