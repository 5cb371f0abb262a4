//! Interactive numbered menu.
//!
//! The menu reads whole lines from any [`AsyncBufRead`] and writes to any
//! [`Write`], so a session can be scripted in tests with a byte slice and
//! a `Vec<u8>`. End of input behaves like choosing Exit.

use std::io::{self, Write};

use crossterm::style::Stylize;
use crossterm::{cursor, queue, terminal};
use endel_bridge::store::StoreError;
use endel_proto::task::{Priority, Task, TaskList, format_short, parse_due_date};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::app::App;
use crate::sync::SyncError;

/// Errors that end a menu session.
#[derive(Debug, thiserror::Error)]
pub enum MenuError {
    /// Reading input or writing output failed.
    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),
    /// The task file can no longer be written.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One entry of the main menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    /// 1: list all tasks.
    View,
    /// 2: add a task.
    Add,
    /// 3: mark a task completed.
    Complete,
    /// 4: delete a task.
    Delete,
    /// 5: replace local tasks with the peer's.
    Pull,
    /// 6: replace the peer's tasks with ours.
    Push,
    /// 7: show the timetable.
    Timetable,
    /// 8: quit.
    Exit,
}

impl MenuChoice {
    /// Every choice in menu order.
    pub const ALL: [Self; 8] = [
        Self::View,
        Self::Add,
        Self::Complete,
        Self::Delete,
        Self::Pull,
        Self::Push,
        Self::Timetable,
        Self::Exit,
    ];

    /// Parses the number typed at the menu prompt.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let n: usize = text.trim().parse().ok()?;
        Self::ALL.get(n.checked_sub(1)?).copied()
    }

    /// Label shown in the menu.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::View => "View tasks",
            Self::Add => "Add task",
            Self::Complete => "Complete task",
            Self::Delete => "Delete task",
            Self::Pull => "Pull from peer",
            Self::Push => "Push to peer",
            Self::Timetable => "View timetable",
            Self::Exit => "Exit",
        }
    }
}

/// Converts a 1-based number typed by the user into a list position.
///
/// Returns `None` for anything that is not a whole number of at least 1.
#[must_use]
pub fn parse_position(text: &str) -> Option<usize> {
    let n: i64 = text.trim().parse().ok()?;
    if n < 1 {
        return None;
    }
    usize::try_from(n - 1).ok()
}

/// Whether the session continues after an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Continue,
    Quit,
}

/// A menu session over an input and an output stream.
pub struct Menu<'a, R, W> {
    app: &'a App,
    input: R,
    out: W,
}

impl<'a, R, W> Menu<'a, R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    /// Creates a session for `app`.
    pub const fn new(app: &'a App, input: R, out: W) -> Self {
        Self { app, input, out }
    }

    /// Runs until Exit is chosen or input ends.
    ///
    /// Recoverable problems (bad input, a corrupt task file, an unreachable
    /// peer) are reported and the menu is shown again.
    ///
    /// # Errors
    ///
    /// Returns [`MenuError::Io`] if the terminal fails, or
    /// [`MenuError::Store`] if the task file can no longer be written.
    pub async fn run(&mut self) -> Result<(), MenuError> {
        loop {
            self.draw_menu()?;
            let Some(line) = self.read_line().await? else {
                return Ok(());
            };

            let Some(choice) = MenuChoice::parse(&line) else {
                writeln!(self.out, "{}", "Invalid option.".red())?;
                continue;
            };
            tracing::debug!(?choice, "menu choice");

            let step = match choice {
                MenuChoice::View => self.view().await?,
                MenuChoice::Add => self.add().await?,
                MenuChoice::Complete => self.complete().await?,
                MenuChoice::Delete => self.delete().await?,
                MenuChoice::Pull => self.pull().await?,
                MenuChoice::Push => self.push().await?,
                MenuChoice::Timetable => self.timetable()?,
                MenuChoice::Exit => {
                    writeln!(self.out, "Bye!")?;
                    return Ok(());
                }
            };
            if step == Step::Quit || self.pause().await? == Step::Quit {
                return Ok(());
            }
        }
    }

    fn draw_menu(&mut self) -> io::Result<()> {
        if self.app.clear_screen {
            queue!(
                self.out,
                terminal::Clear(terminal::ClearType::All),
                cursor::MoveTo(0, 0)
            )?;
        }
        writeln!(self.out, "{}", "=== Endel ===".bold().cyan())?;
        for (n, choice) in MenuChoice::ALL.iter().enumerate() {
            writeln!(self.out, "{}. {}", n + 1, choice.label())?;
        }
        self.prompt("Choose an option: ")
    }

    // -- Actions --

    async fn view(&mut self) -> Result<Step, MenuError> {
        if let Some(tasks) = self.load().await? {
            self.print_tasks(&tasks)?;
        }
        Ok(Step::Continue)
    }

    async fn add(&mut self) -> Result<Step, MenuError> {
        let app = self.app;
        self.prompt("Task name: ")?;
        let Some(name) = self.read_line().await? else {
            return Ok(Step::Quit);
        };

        let due_date = loop {
            self.prompt("Due date (dd/mm/yy or YYYY-MM-DD): ")?;
            let Some(text) = self.read_line().await? else {
                return Ok(Step::Quit);
            };
            if let Some(date) = parse_due_date(&text) {
                break date;
            }
            writeln!(self.out, "{}", "Invalid date, try again.".red())?;
        };

        let subject = if app.timetable.subjects().is_empty() {
            None
        } else {
            writeln!(self.out, "  0. (none)")?;
            for (n, subject) in app.timetable.subjects().iter().enumerate() {
                match &subject.teacher {
                    Some(teacher) => writeln!(self.out, "  {}. {} ({teacher})", n + 1, subject.code)?,
                    None => writeln!(self.out, "  {}. {}", n + 1, subject.code)?,
                }
            }
            self.prompt("Subject number or code: ")?;
            let Some(text) = self.read_line().await? else {
                return Ok(Step::Quit);
            };
            parse_position(&text)
                .and_then(|i| app.timetable.subjects().get(i))
                .or_else(|| app.timetable.subject(text.trim()))
        };

        self.prompt("Priority (alta/media/baja): ")?;
        let Some(priority) = self.read_line().await? else {
            return Ok(Step::Quit);
        };

        let mut task = Task::new(&name, due_date, Priority::parse_lenient(&priority));
        if let Some(subject) = subject {
            task = task.with_subject(subject.code.clone(), subject.teacher.clone());
        }
        let added = task.name.clone();

        match app.store.add_task(task).await {
            Ok(_) => writeln!(self.out, "{} {added}", "Task added:".green())?,
            Err(e) => self.report(e)?,
        }
        Ok(Step::Continue)
    }

    async fn complete(&mut self) -> Result<Step, MenuError> {
        let Some(index) = self.pick_task("Task number to complete: ").await? else {
            return Ok(Step::Continue);
        };
        let Some(index) = index else {
            return Ok(Step::Quit);
        };

        match self.app.store.complete(index).await {
            Ok(tasks) => {
                let name = tasks.as_slice().get(index).map_or("", |t| t.name.as_str());
                writeln!(self.out, "{} {name}", "Completed:".green())?;
            }
            Err(e) => self.report(e)?,
        }
        Ok(Step::Continue)
    }

    async fn delete(&mut self) -> Result<Step, MenuError> {
        let Some(index) = self.pick_task("Task number to delete: ").await? else {
            return Ok(Step::Continue);
        };
        let Some(index) = index else {
            return Ok(Step::Quit);
        };

        match self.app.store.delete(index).await {
            Ok((removed, _)) => writeln!(self.out, "{} {}", "Deleted:".green(), removed.name)?,
            Err(e) => self.report(e)?,
        }
        Ok(Step::Continue)
    }

    async fn pull(&mut self) -> Result<Step, MenuError> {
        let app = self.app;
        let Some(sync) = &app.sync else {
            self.no_peer_hint()?;
            return Ok(Step::Continue);
        };
        writeln!(self.out, "Pulling tasks from {}...", sync.peer())?;
        match sync.pull(&app.store).await {
            Ok(count) => writeln!(
                self.out,
                "{} {count} tasks received from {}",
                "Pulled:".green(),
                sync.peer()
            )?,
            Err(e) => self.report_sync(e)?,
        }
        Ok(Step::Continue)
    }

    async fn push(&mut self) -> Result<Step, MenuError> {
        let app = self.app;
        let Some(sync) = &app.sync else {
            self.no_peer_hint()?;
            return Ok(Step::Continue);
        };
        writeln!(self.out, "Pushing tasks to {}...", sync.peer())?;
        match sync.push(&app.store).await {
            Ok(count) => writeln!(
                self.out,
                "{} {count} tasks sent to {}",
                "Pushed:".green(),
                sync.peer()
            )?,
            Err(e) => self.report_sync(e)?,
        }
        Ok(Step::Continue)
    }

    fn timetable(&mut self) -> Result<Step, MenuError> {
        if self.app.timetable.is_empty() {
            writeln!(
                self.out,
                "No timetable configured. Add a [timetable] section to the config file."
            )?;
        } else {
            self.app.timetable.render(&mut self.out)?;
        }
        Ok(Step::Continue)
    }

    // -- Helpers --

    /// Shows the list and asks for a 1-based number.
    ///
    /// `Ok(None)` means nothing to do (already reported), `Ok(Some(None))`
    /// means input ended.
    async fn pick_task(&mut self, prompt: &str) -> Result<Option<Option<usize>>, MenuError> {
        let Some(tasks) = self.load().await? else {
            return Ok(None);
        };
        self.print_tasks(&tasks)?;

        self.prompt(prompt)?;
        let Some(text) = self.read_line().await? else {
            return Ok(Some(None));
        };
        match parse_position(&text) {
            Some(index) => Ok(Some(Some(index))),
            None => {
                writeln!(self.out, "{}", "Invalid number.".red())?;
                Ok(None)
            }
        }
    }

    /// Loads the collection, reporting recoverable errors as `None`.
    async fn load(&mut self) -> Result<Option<TaskList>, MenuError> {
        match self.app.store.load().await {
            Ok(tasks) => Ok(Some(tasks)),
            Err(e) => {
                self.report(e)?;
                Ok(None)
            }
        }
    }

    fn print_tasks(&mut self, tasks: &TaskList) -> io::Result<()> {
        if tasks.is_empty() {
            return writeln!(self.out, "No tasks yet.");
        }
        for (n, task) in tasks.iter().enumerate() {
            let mark = if task.completed {
                "✔".green()
            } else {
                "✘".red()
            };
            let priority = match task.priority {
                Priority::High => task.priority.as_wire().red(),
                Priority::Medium => task.priority.as_wire().yellow(),
                Priority::Low => task.priority.as_wire().green(),
            };
            write!(
                self.out,
                "{}. {mark} {} - {} - [{priority}]",
                n + 1,
                task.name,
                format_short(task.due_date)
            )?;
            match (&task.subject, &task.teacher) {
                (Some(subject), Some(teacher)) => write!(self.out, " {subject} ({teacher})")?,
                (Some(subject), None) => write!(self.out, " {subject}")?,
                _ => {}
            }
            writeln!(self.out)?;
        }
        Ok(())
    }

    fn no_peer_hint(&mut self) -> io::Result<()> {
        writeln!(
            self.out,
            "No peer configured. Use --peer <host[:port]> or set [sync] peer in the config file."
        )
    }

    /// Prints a store error, or returns it if the session cannot go on.
    fn report(&mut self, err: StoreError) -> Result<(), MenuError> {
        if err.is_fatal() {
            return Err(err.into());
        }
        tracing::warn!(error = %err, "menu action failed");
        writeln!(self.out, "{} {err}", "Error:".red())?;
        Ok(())
    }

    fn report_sync(&mut self, err: SyncError) -> Result<(), MenuError> {
        match err {
            SyncError::Store(e) => self.report(e),
            other => {
                tracing::warn!(error = %other, "sync failed");
                writeln!(self.out, "{} {other}", "Sync failed:".red())?;
                Ok(())
            }
        }
    }

    /// Waits for Enter before the screen is cleared again.
    async fn pause(&mut self) -> Result<Step, MenuError> {
        if !self.app.clear_screen {
            return Ok(Step::Continue);
        }
        self.prompt("Press Enter to continue...")?;
        Ok(match self.read_line().await? {
            Some(_) => Step::Continue,
            None => Step::Quit,
        })
    }

    fn prompt(&mut self, text: &str) -> io::Result<()> {
        write!(self.out, "{text}")?;
        self.out.flush()
    }

    /// Reads one line without its terminator. `None` at end of input.
    async fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }
}
