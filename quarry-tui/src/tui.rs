use crate::{
    command::{Command, parse_command},
    input::InputLine,
    styles,
    transcript::{self, TranscriptLine},
    view::{self, ViewSnap},
};
use anyhow::Result;
use async_trait::async_trait;
use crossterm::{
    event::{Event as CtEvent, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use quarry_actors::{
    ModelMenu, ResearchHandle, Turn,
    actor::{Actor, Addr, Context},
    system::ShutdownHandle,
};
use quarry_research::{ChatEntry, Progress};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::{
    future::Future,
    io::{self, Stdout},
    path::PathBuf,
    time::{Duration, Instant},
};

const BRAILLE_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub enum TuiMsg {
    InputEvent(CtEvent),
    Tick,
    Submit(String),
    Progress(Progress),
    TurnDone(Turn),
    ModelChanged(ModelMenu),
    ModelsListed(ModelMenu),
    HistoryListed(Vec<ChatEntry>),
    Cleared,
    Exported(PathBuf),
    OpError(String),
    Shutdown,
}

pub struct TuiActor {
    research: ResearchHandle,
    model: String,

    // terminal
    term: Terminal<CrosstermBackend<Stdout>>,
    tick_rate: Duration,
    last_tick: Instant,

    // ui state
    input: InputLine,
    lines: Vec<TranscriptLine>,
    scroll: usize, // rows from bottom
    dirty: bool,
    activity: Option<String>,

    // busy/spinner
    busy: u32,
    spin_idx: usize,

    shutdown: ShutdownHandle,
}

impl TuiActor {
    /// Switches the terminal to raw mode on the alternate screen.
    pub fn new(
        research: ResearchHandle,
        model: impl Into<String>,
        shutdown: ShutdownHandle,
    ) -> Result<Self> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut term = Terminal::new(backend)?;
        term.clear()?;

        Ok(Self {
            research,
            model: model.into(),
            term,
            tick_rate: Duration::from_millis(80),
            last_tick: Instant::now(),
            input: InputLine::default(),
            lines: vec![
                TranscriptLine::new(
                    "Ask a research question. Type /help for commands.",
                    styles::system(),
                ),
                TranscriptLine::blank(),
            ],
            scroll: 0,
            dirty: true,
            activity: None,
            busy: 0,
            spin_idx: 0,
            shutdown,
        })
    }

    fn push_styled<S: Into<String>>(&mut self, s: S, style: ratatui::style::Style) {
        self.lines.push(TranscriptLine::new(s, style));
        self.dirty = true;
    }

    fn extend(&mut self, lines: Vec<TranscriptLine>) {
        self.lines.extend(lines);
        // New output snaps the view back to the bottom.
        self.scroll = 0;
        self.dirty = true;
    }

    fn spinner(&self) -> &'static str {
        if self.busy > 0 {
            BRAILLE_FRAMES[self.spin_idx % BRAILLE_FRAMES.len()]
        } else {
            " "
        }
    }

    fn set_busy(&mut self, on: bool) {
        if on {
            self.busy = self.busy.saturating_add(1)
        } else {
            self.busy = self.busy.saturating_sub(1)
        }
        if self.busy == 0 {
            self.activity = None;
        }
        self.dirty = true;
    }

    fn step_spinner(&mut self) {
        if self.busy > 0 {
            self.spin_idx = (self.spin_idx + 1) % BRAILLE_FRAMES.len();
            self.dirty = true;
        }
    }

    fn draw(&mut self) -> Result<()> {
        let snap = ViewSnap {
            input: self.input.text(),
            input_cursor: self.input.cursor(),
            lines: &self.lines,
            scroll: self.scroll,
            busy: self.busy,
            spinner: self.spinner(),
            model: &self.model,
            activity: self.activity.as_deref(),
        };
        view::draw(&mut self.term, &snap)
    }

    fn handle_key(&mut self, key: KeyEvent) -> Option<TuiMsg> {
        match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL)
            | (KeyCode::Char('q'), KeyModifiers::CONTROL) => return Some(TuiMsg::Shutdown),
            (KeyCode::PageUp, _) => self.scroll = self.scroll.saturating_add(5),
            (KeyCode::PageDown, _) => self.scroll = self.scroll.saturating_sub(5),
            (KeyCode::Up, _) => self.scroll = self.scroll.saturating_add(1),
            (KeyCode::Down, _) => self.scroll = self.scroll.saturating_sub(1),
            (KeyCode::Enter, _) => {
                self.dirty = true;
                return Some(TuiMsg::Submit(self.input.take()));
            }
            (KeyCode::Left, _) => self.input.left(),
            (KeyCode::Right, _) => self.input.right(),
            (KeyCode::Home, _) => self.input.home(),
            (KeyCode::End, _) => self.input.end(),
            (KeyCode::Backspace, _) => self.input.backspace(),
            (KeyCode::Delete, _) => self.input.delete(),
            (KeyCode::Esc, _) => self.input.clear(),
            (KeyCode::Char(ch), _) => self.input.insert(ch),
            _ => return None,
        }
        self.dirty = true;
        None
    }

    /// Run `fut` off the actor and post its result back as a message.
    fn request<T, Fut>(&mut self, me: Addr<TuiActor>, fut: Fut, done: fn(T) -> TuiMsg)
    where
        T: Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        self.set_busy(true);
        tokio::spawn(async move {
            let msg = match fut.await {
                Ok(value) => done(value),
                Err(e) => TuiMsg::OpError(e.to_string()),
            };
            let _ = me.send(msg).await;
        });
    }

    fn route_submit(&mut self, line: String, me: Addr<TuiActor>) {
        let s = line.trim().to_string();
        if s.is_empty() {
            return;
        }

        if s.starts_with('/') {
            let cmd = parse_command(&s);
            self.handle_command(cmd, me);
            return;
        }

        self.extend(transcript::user_lines(&s));
        let research = self.research.clone();
        self.request(me, async move { research.submit(s).await }, TuiMsg::TurnDone);
    }

    fn handle_command(&mut self, cmd: Command, me: Addr<TuiActor>) {
        let research = self.research.clone();
        match cmd {
            Command::Quit => {
                let _ = me.try_send(TuiMsg::Shutdown);
            }
            Command::Help => self.extend(transcript::help_lines()),
            Command::Model(None) => {
                let model = self.model.clone();
                self.push_styled("Selected model:", styles::label());
                self.push_styled(format!("  {model}"), styles::value());
                self.push_styled("", styles::dim());
            }
            Command::Model(Some(name)) => {
                self.request(
                    me,
                    async move { research.select_model(name).await },
                    TuiMsg::ModelChanged,
                );
            }
            Command::Models => {
                self.request(me, async move { research.models().await }, TuiMsg::ModelsListed);
            }
            Command::Clear => {
                self.request(me, async move { research.clear().await }, |()| TuiMsg::Cleared);
            }
            Command::Export(dir) => {
                self.request(me, async move { research.export(dir).await }, TuiMsg::Exported);
            }
            Command::History => {
                self.request(
                    me,
                    async move { research.history().await },
                    TuiMsg::HistoryListed,
                );
            }
            Command::Unknown(s) => {
                self.push_styled(format!("× Unknown command: {s}"), styles::error());
                self.push_styled("Try `/help`.", styles::dim());
                self.push_styled("", styles::dim());
            }
        }
    }

    fn restore_terminal(&mut self) {
        disable_raw_mode().ok();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        let _ = self.term.show_cursor();
    }
}

#[async_trait]
impl Actor for TuiActor {
    type Msg = TuiMsg;

    async fn handle(&mut self, msg: Self::Msg, ctx: &mut Context<Self>) -> Result<()> {
        match msg {
            TuiMsg::InputEvent(ev) => {
                if let CtEvent::Key(k) = ev
                    && let Some(next) = self.handle_key(k)
                {
                    let _ = ctx.addr().try_send(next);
                }
            }
            TuiMsg::Submit(line) => self.route_submit(line, ctx.addr()),
            TuiMsg::Progress(event) => {
                self.activity = Some(event.to_string());
                self.extend(vec![transcript::progress_line(&event)]);
            }
            TuiMsg::TurnDone(turn) => {
                tracing::debug!(model = %turn.model, banner = %turn.outcome.banner(), "tui.turn.rendered");
                self.extend(transcript::turn_lines(&turn));
                self.set_busy(false);
            }
            TuiMsg::ModelChanged(menu) => {
                self.push_styled(format!("✓ Using {}.", menu.selected), styles::system());
                self.push_styled("", styles::dim());
                self.model = menu.selected;
                self.set_busy(false);
            }
            TuiMsg::ModelsListed(menu) => {
                self.model = menu.selected.clone();
                self.extend(transcript::models_lines(&menu));
                self.set_busy(false);
            }
            TuiMsg::HistoryListed(history) => {
                self.extend(transcript::history_lines(&history));
                self.set_busy(false);
            }
            TuiMsg::Cleared => {
                self.lines.clear();
                self.push_styled("✓ Started a new session.", styles::system());
                self.push_styled("", styles::dim());
                self.scroll = 0;
                self.set_busy(false);
            }
            TuiMsg::Exported(path) => {
                self.push_styled(format!("✓ Saved {}", path.display()), styles::system());
                self.push_styled("", styles::dim());
                self.set_busy(false);
            }
            TuiMsg::OpError(e) => {
                tracing::warn!(error = %e, "tui.op.failed");
                self.push_styled(format!("× Error: {e}"), styles::error());
                self.push_styled("", styles::dim());
                self.set_busy(false);
            }
            TuiMsg::Tick => {
                self.step_spinner();
                if self.dirty || self.last_tick.elapsed() >= self.tick_rate {
                    self.draw()?;
                    self.last_tick = Instant::now();
                    self.dirty = false;
                }
            }
            TuiMsg::Shutdown => {
                self.restore_terminal();
                self.shutdown.signal();
                ctx.stop();
            }
        }

        Ok(())
    }
}
