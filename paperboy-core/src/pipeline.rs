//! Orchestrator: wires the pipeline stages in sequence.
//!
//! Run state is persisted only after every downstream stage has completed
//! without a fatal error, and never on a dry run — state can never advance
//! past a run that did not produce a usable report. A zero-paper fetch is
//! a success path: the empty digest is still rendered and written.

use chrono::{DateTime, Utc};
use std::future::Future;
use std::path::PathBuf;
use tracing::info;

use crate::classify::classify_papers;
use crate::config::PaperboyConfig;
use crate::error::Result;
use crate::fetch::fetch_papers;
use crate::gemini::GeminiClient;
use crate::llm::{CallBudget, LlmClient};
use crate::output::{DispatchOptions, LettreSmtp, SmtpSender, dispatch};
use crate::report::{DigestReport, render_html};
use crate::state::{RunState, compute_window, load_state, save_state};
use crate::summarize::summarize_industry;
use crate::types::{PaperRecord, Window, sort_canonical};

/// CLI-controlled behavior for one run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunFlags {
    pub dry_run: bool,
    pub no_email: bool,
    pub lookback_days: Option<i64>,
}

impl RunFlags {
    /// Whether this run will attempt an email send.
    pub fn will_send_email(&self) -> bool {
        !self.dry_run && !self.no_email
    }
}

/// What a completed run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub report: DigestReport,
    /// Path of the written HTML report; `None` on a dry run.
    pub report_path: Option<PathBuf>,
    pub llm_calls_used: usize,
    pub llm_calls_max: usize,
}

/// SMTP stand-in for runs that will never send (dry-run / no-email).
struct NullSmtp;

#[async_trait::async_trait]
impl SmtpSender for NullSmtp {
    async fn send_email(
        &self,
        _to: &str,
        _subject: &str,
        _html: &str,
    ) -> std::result::Result<String, String> {
        Err("email disabled for this run".to_string())
    }
}

/// Execute a full production run with real clients.
pub async fn run(config: &PaperboyConfig, flags: RunFlags) -> Result<RunOutcome> {
    // Fail on missing configuration before any network call.
    config.validate_for_run(flags.will_send_email())?;

    let llm = GeminiClient::new(&config.llm).map_err(crate::error::PaperboyError::Llm)?;

    if flags.will_send_email() {
        let smtp = LettreSmtp::from_config(&config.email)
            .map_err(crate::error::PaperboyError::Config)?;
        run_with(config, flags, &llm, &smtp, Utc::now(), |window| async move {
            fetch_papers(&config.fetch, &window).await
        })
        .await
    } else {
        run_with(config, flags, &llm, &NullSmtp, Utc::now(), |window| async move {
            fetch_papers(&config.fetch, &window).await
        })
        .await
    }
}

/// Core sequencing over injected seams. `fetcher` produces the raw paper
/// set for the computed window; tests pass a canned closure.
pub async fn run_with<F, Fut>(
    config: &PaperboyConfig,
    flags: RunFlags,
    llm: &dyn LlmClient,
    smtp: &dyn SmtpSender,
    now: DateTime<Utc>,
    fetcher: F,
) -> Result<RunOutcome>
where
    F: FnOnce(Window) -> Fut,
    Fut: Future<Output = Vec<PaperRecord>>,
{
    info!("=== paperboy: daily industry-paper digest ===");

    let state = load_state(&config.state.path);
    let window = compute_window(
        state.as_ref(),
        flags.lookback_days,
        config.fetch.default_lookback_days,
        now,
    );

    info!("Step 1: fetching papers");
    let mut papers = fetcher(window).await;
    sort_canonical(&mut papers);

    info!("Step 2: classifying {} papers", papers.len());
    let mut budget = CallBudget::new(config.llm.max_calls);
    let mut classified = classify_papers(llm, papers, config.llm.batch_size, &mut budget).await;

    let industry_count = classified
        .iter()
        .filter(|p| p.classification.is_industry())
        .count();
    let academia_count = classified
        .iter()
        .filter(|p| p.classification == crate::types::Classification::Academia)
        .count();
    info!(
        "Classification results: {} industry, {} academia, {} other",
        industry_count,
        academia_count,
        classified.len() - industry_count - academia_count,
    );

    if industry_count > 0 {
        info!("Step 3: summarizing {} industry papers", industry_count);
        summarize_industry(llm, &mut classified, config.fetch.summary_cap, &mut budget).await;
    }
    info!("LLM calls used: {} / {}", budget.used(), budget.max());

    info!("Step 4: rendering report");
    let report = DigestReport::build(window, now, classified);
    let html = render_html(&report);

    info!("Step 5: delivering report");
    let report_path = dispatch(
        &report,
        &html,
        &config.reports.dir,
        smtp,
        &config.email.recipient,
        DispatchOptions {
            dry_run: flags.dry_run,
            no_email: flags.no_email,
        },
    )
    .await
    .map_err(crate::error::PaperboyError::Output)?;

    if flags.dry_run {
        info!("Dry run: state not updated (next run covers the same window)");
    } else {
        save_state(
            &RunState {
                last_run_end: window.end,
                last_run_papers: report.total_fetched,
                last_run_industry: report.papers.len(),
            },
            &config.state.path,
        )
        .map_err(crate::error::PaperboyError::State)?;
        info!("State updated: next run picks up from {}", window.end);
    }

    Ok(RunOutcome {
        report,
        report_path,
        llm_calls_used: budget.used(),
        llm_calls_max: budget.max(),
    })
}
