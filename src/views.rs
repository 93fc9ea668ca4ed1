//! View models for the dashboard and login pages
//!
//! Each page render builds these from current state and hands them to the
//! templates. They hold no I/O and make every display decision up front
//! (what is disabled and why, which history variant shows, which message
//! class applies), so the templates only print fields.

use crate::auth::AuthFlow;
use crate::config::CreditsConfig;
use crate::credits::{generation_cost, CreditBalance, CreditBundle, BUNDLES};
use crate::generation::ContentType;
use crate::storage::HistoryItem;
use serde::Serialize;

/// Placeholder text of the prompt field
pub const PROMPT_PLACEHOLDER: &str = "e.g., A 45-minute ESL lesson...";

/// Heading of the empty history placeholder
pub const EMPTY_HISTORY_TITLE: &str = "No Generations Yet";

/// Body of the empty history placeholder
pub const EMPTY_HISTORY_MESSAGE: &str = "Your generated lessons and presentations will appear here.";

// ---------------------------------------------------------------------------
// Prompt form
// ---------------------------------------------------------------------------

/// Why the generate button is disabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisabledReason {
    /// Prompt is empty after trimming
    EmptyPrompt,
    /// A generation is already running
    Loading,
    /// No signed-in user
    Unauthenticated,
    /// The cost exceeds the balance
    InsufficientCredits,
}

impl DisabledReason {
    /// Short hint shown next to the disabled button
    pub fn message(&self) -> &'static str {
        match self {
            Self::EmptyPrompt => "Describe the lesson you want to forge",
            Self::Loading => "Forging your content...",
            Self::Unauthenticated => "Sign in to forge content",
            Self::InsufficientCredits => "Not enough credits for this request",
        }
    }
}

/// State of the prompt form for one render
///
/// # Examples
///
/// ```
/// use lesson_forge::config::CreditsConfig;
/// use lesson_forge::credits::CreditBalance;
/// use lesson_forge::views::{DisabledReason, PromptForm};
///
/// let mut form = PromptForm::new(true, CreditBalance::new(5));
/// assert_eq!(form.disabled_reason(&CreditsConfig::default()), Some(DisabledReason::EmptyPrompt));
///
/// form.prompt = "Past tense warm-up".to_string();
/// assert!(form.can_submit(&CreditsConfig::default()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptForm {
    /// Prompt text as typed
    pub prompt: String,
    /// Selected content type
    pub content_type: ContentType,
    /// Image toggle
    pub include_images: bool,
    /// A submission is pending
    pub is_loading: bool,
    /// A user is signed in
    pub authenticated: bool,
    /// Balance shown next to the cost
    pub balance: CreditBalance,
}

impl PromptForm {
    /// Empty form for a user with `balance`
    pub fn new(authenticated: bool, balance: CreditBalance) -> Self {
        Self {
            prompt: String::new(),
            content_type: ContentType::default(),
            include_images: false,
            is_loading: false,
            authenticated,
            balance,
        }
    }

    /// Credits the current selection costs
    pub fn cost(&self, pricing: &CreditsConfig) -> u32 {
        generation_cost(self.content_type, self.include_images, pricing)
    }

    /// First condition that keeps the form from submitting
    pub fn disabled_reason(&self, pricing: &CreditsConfig) -> Option<DisabledReason> {
        if self.prompt.trim().is_empty() {
            Some(DisabledReason::EmptyPrompt)
        } else if self.is_loading {
            Some(DisabledReason::Loading)
        } else if !self.authenticated {
            Some(DisabledReason::Unauthenticated)
        } else if !self.balance.covers(self.cost(pricing)) {
            Some(DisabledReason::InsufficientCredits)
        } else {
            None
        }
    }

    /// Whether the generate button is enabled
    pub fn can_submit(&self, pricing: &CreditsConfig) -> bool {
        self.disabled_reason(pricing).is_none()
    }

    /// Marks the form as submitting
    ///
    /// Returns `false` without changing anything when the form cannot submit.
    pub fn begin_submit(&mut self, pricing: &CreditsConfig) -> bool {
        if !self.can_submit(pricing) {
            return false;
        }
        self.is_loading = true;
        true
    }

    /// Clears the pending flag after the submission finished either way
    ///
    /// Returns `true` only for the call that actually cleared it.
    pub fn settle(&mut self) -> bool {
        std::mem::replace(&mut self.is_loading, false)
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// One rendered history entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryRow {
    /// Prompt of the generation
    pub prompt: String,
    /// Creation date as `YYYY-MM-DD`
    pub date: String,
    /// Download link of the stored file
    pub download_url: String,
    /// Content type label, e.g. `Lesson Plan`
    pub label: &'static str,
}

impl From<&HistoryItem> for HistoryRow {
    fn from(item: &HistoryItem) -> Self {
        Self {
            prompt: item.prompt.clone(),
            date: item.created_at.format("%Y-%m-%d").to_string(),
            download_url: item.file_path.clone(),
            label: item.content_type.label(),
        }
    }
}

/// What the history section shows
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "rows", rename_all = "snake_case")]
pub enum HistoryView {
    /// A generation for this user is still running, so the list is about to change
    Loading,
    /// No generations; show the placeholder
    Empty,
    /// One row per generation, in the order given
    Populated(Vec<HistoryRow>),
}

impl HistoryView {
    /// Picks the variant for a fetched history list
    ///
    /// # Examples
    ///
    /// ```
    /// use lesson_forge::views::HistoryView;
    ///
    /// assert_eq!(HistoryView::from_items(&[]), HistoryView::Empty);
    /// ```
    pub fn from_items(items: &[HistoryItem]) -> Self {
        if items.is_empty() {
            Self::Empty
        } else {
            Self::Populated(items.iter().map(HistoryRow::from).collect())
        }
    }

    /// Picks the variant for one render, given whether a generation is pending
    ///
    /// # Examples
    ///
    /// ```
    /// use lesson_forge::views::HistoryView;
    ///
    /// assert_eq!(HistoryView::for_render(&[], true), HistoryView::Loading);
    /// assert_eq!(HistoryView::for_render(&[], false), HistoryView::Empty);
    /// ```
    pub fn for_render(items: &[HistoryItem], generation_pending: bool) -> Self {
        if generation_pending {
            Self::Loading
        } else {
            Self::from_items(items)
        }
    }

    /// Rows to render; empty unless populated
    pub fn rows(&self) -> &[HistoryRow] {
        match self {
            Self::Populated(rows) => rows,
            _ => &[],
        }
    }
}

// ---------------------------------------------------------------------------
// Credits
// ---------------------------------------------------------------------------

/// Balance badge shown in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CreditView {
    /// Credits held, never negative
    pub credits: u32,
    /// Signed in; anonymous visitors see 0 and a sign-in link
    pub authenticated: bool,
}

impl CreditView {
    /// Badge for a signed-in user
    pub fn signed_in(balance: CreditBalance) -> Self {
        Self {
            credits: balance.credits(),
            authenticated: true,
        }
    }

    /// Badge for an anonymous visitor
    pub fn anonymous() -> Self {
        Self {
            credits: 0,
            authenticated: false,
        }
    }

    /// Badge text, e.g. `12 Credits`
    pub fn label(&self) -> String {
        format!("{} Credits", self.credits)
    }
}

// ---------------------------------------------------------------------------
// Login form
// ---------------------------------------------------------------------------

/// Whether the login page signs in or registers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginMode {
    /// Existing account
    #[default]
    SignIn,
    /// New account
    Register,
}

impl LoginMode {
    /// Form heading
    pub fn title(&self) -> &'static str {
        match self {
            Self::SignIn => "Welcome Back",
            Self::Register => "Create Account",
        }
    }

    /// Submit button label
    pub fn submit_label(&self) -> &'static str {
        match self {
            Self::SignIn => "Sign In",
            Self::Register => "Register",
        }
    }

    /// Prompt before the mode toggle link
    pub fn toggle_prompt(&self) -> &'static str {
        match self {
            Self::SignIn => "Don't have an account?",
            Self::Register => "Already have an account?",
        }
    }

    /// Mode toggle link label
    pub fn toggle_label(&self) -> &'static str {
        match self {
            Self::SignIn => "Register Now",
            Self::Register => "Sign In",
        }
    }

    /// The other mode
    pub fn toggled(&self) -> Self {
        match self {
            Self::SignIn => Self::Register,
            Self::Register => Self::SignIn,
        }
    }

    /// Query/form value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SignIn => "sign_in",
            Self::Register => "register",
        }
    }
}

/// Classification of the message box on the login page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Failed attempt
    Error,
    /// Informational, e.g. confirmation email sent
    Success,
}

/// Message shown above the login form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormMessage {
    /// Text
    pub text: String,
    /// Classification
    pub kind: MessageKind,
}

/// State of the login form for one render
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginForm {
    /// Sign in or register
    pub mode: LoginMode,
    /// Email to pre-fill
    pub email: String,
    /// Error or notice
    pub message: Option<FormMessage>,
    /// A submission is pending
    pub is_loading: bool,
    /// Show the Google button
    pub google_enabled: bool,
}

impl LoginForm {
    /// Builds the form from a browser's auth flow
    ///
    /// An error state renders as an error message with the email kept; a
    /// pending notice renders as a success message.
    ///
    /// # Examples
    ///
    /// ```
    /// use lesson_forge::auth::AuthFlow;
    /// use lesson_forge::views::{LoginForm, LoginMode, MessageKind};
    ///
    /// let mut flow = AuthFlow::new();
    /// flow.begin_sign_in("teacher@example.com").unwrap();
    /// flow.fail("Invalid login credentials").unwrap();
    ///
    /// let form = LoginForm::from_flow(&flow, LoginMode::SignIn, true);
    /// assert_eq!(form.email, "teacher@example.com");
    /// assert_eq!(form.message.unwrap().kind, MessageKind::Error);
    /// assert!(!form.is_loading);
    /// ```
    pub fn from_flow(flow: &AuthFlow, mode: LoginMode, google_enabled: bool) -> Self {
        let message = if let Some(error) = flow.error_message() {
            Some(FormMessage {
                text: error.to_string(),
                kind: MessageKind::Error,
            })
        } else {
            flow.notice().map(|notice| FormMessage {
                text: notice.to_string(),
                kind: MessageKind::Success,
            })
        };

        Self {
            mode,
            email: flow.email().to_string(),
            message,
            is_loading: flow.is_loading(),
            google_enabled,
        }
    }
}

// ---------------------------------------------------------------------------
// Purchase panel
// ---------------------------------------------------------------------------

/// One bundle button
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleOption {
    /// Button text, e.g. `10 Credits | $9.99`
    pub label: String,
    /// Credits added
    pub credits: u32,
    /// Show the "Best Value" tag
    pub best_value: bool,
}

impl From<&CreditBundle> for BundleOption {
    fn from(bundle: &CreditBundle) -> Self {
        Self {
            label: bundle.label(),
            credits: bundle.credits,
            best_value: bundle.best_value,
        }
    }
}

/// The "Fuel Your Forge" panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurchasePanel {
    /// Panel heading
    pub title: &'static str,
    /// Bundle buttons in display order
    pub bundles: Vec<BundleOption>,
}

impl Default for PurchasePanel {
    fn default() -> Self {
        Self {
            title: "Fuel Your Forge",
            bundles: BUNDLES.iter().map(BundleOption::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn pricing() -> CreditsConfig {
        CreditsConfig::default()
    }

    fn ready_form() -> PromptForm {
        let mut form = PromptForm::new(true, CreditBalance::new(10));
        form.prompt = "Irregular verbs quiz".to_string();
        form
    }

    fn item(prompt: &str, day: u32) -> HistoryItem {
        HistoryItem {
            id: format!("id-{}", day),
            prompt: prompt.to_string(),
            content_type: ContentType::Lesson,
            file_path: format!("https://files.example/{}.pdf", day),
            status: "completed".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 3, day, 9, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_whitespace_prompt_disables_submit() {
        let mut form = ready_form();
        for prompt in ["", " ", "\n\t  "] {
            form.prompt = prompt.to_string();
            assert!(!form.can_submit(&pricing()));
            assert_eq!(form.disabled_reason(&pricing()), Some(DisabledReason::EmptyPrompt));
        }
    }

    #[test]
    fn test_loading_disables_then_settles_once() {
        let mut form = ready_form();
        assert!(form.begin_submit(&pricing()));
        assert!(!form.can_submit(&pricing()));
        assert_eq!(form.disabled_reason(&pricing()), Some(DisabledReason::Loading));
        assert!(!form.begin_submit(&pricing()));

        assert!(form.settle());
        assert!(!form.settle());
        assert!(form.can_submit(&pricing()));
    }

    #[test]
    fn test_unauthenticated_disables_submit() {
        let mut form = ready_form();
        form.authenticated = false;
        assert_eq!(
            form.disabled_reason(&pricing()),
            Some(DisabledReason::Unauthenticated)
        );
    }

    #[test]
    fn test_zero_balance_presentation_disabled() {
        let mut form = ready_form();
        form.balance = CreditBalance::new(0);
        form.content_type = ContentType::Presentation;
        assert_eq!(form.cost(&pricing()), 2);
        assert_eq!(
            form.disabled_reason(&pricing()),
            Some(DisabledReason::InsufficientCredits)
        );
    }

    #[test]
    fn test_cost_follows_selection() {
        let mut form = ready_form();
        assert_eq!(form.cost(&pricing()), 1);
        form.include_images = true;
        assert_eq!(form.cost(&pricing()), 2);
        form.content_type = ContentType::Presentation;
        assert_eq!(form.cost(&pricing()), 3);

        form.balance = CreditBalance::new(2);
        assert!(!form.can_submit(&pricing()));
    }

    #[test]
    fn test_empty_history_is_placeholder() {
        let view = HistoryView::from_items(&[]);
        assert_eq!(view, HistoryView::Empty);
        assert!(view.rows().is_empty());
    }

    #[test]
    fn test_history_rows_match_items() {
        let items = vec![item("Weather words", 5), item("Food idioms", 4), item("Travel", 1)];
        let view = HistoryView::from_items(&items);
        let rows = view.rows();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].prompt, "Weather words");
        assert_eq!(rows[0].date, "2024-03-05");
        assert_eq!(rows[1].prompt, "Food idioms");
        assert_eq!(rows[2].date, "2024-03-01");
        assert_eq!(rows[2].download_url, "https://files.example/1.pdf");
        assert_eq!(rows[0].label, "Lesson Plan");
    }

    #[test]
    fn test_pending_generation_renders_loading() {
        let items = vec![item("Weather words", 5)];
        let view = HistoryView::for_render(&items, true);
        assert_eq!(view, HistoryView::Loading);
        assert!(view.rows().is_empty());
        assert_eq!(HistoryView::for_render(&items, false).rows().len(), 1);
    }

    #[test]
    fn test_credit_view_labels() {
        assert_eq!(CreditView::signed_in(CreditBalance::new(7)).label(), "7 Credits");
        let anon = CreditView::anonymous();
        assert_eq!(anon.credits, 0);
        assert!(!anon.authenticated);
    }

    #[test]
    fn test_login_form_titles() {
        let flow = AuthFlow::new();
        let sign_in = LoginForm::from_flow(&flow, LoginMode::SignIn, true);
        assert_eq!(sign_in.mode.title(), "Welcome Back");
        assert_eq!(sign_in.mode.toggle_label(), "Register Now");
        assert!(sign_in.message.is_none());

        let register = LoginForm::from_flow(&flow, LoginMode::Register, false);
        assert_eq!(register.mode.title(), "Create Account");
        assert_eq!(register.mode.toggled(), LoginMode::SignIn);
        assert!(!register.google_enabled);
    }

    #[test]
    fn test_login_form_notice_is_success() {
        let mut flow = AuthFlow::new();
        flow.begin_sign_in("new@example.com").unwrap();
        flow.confirmation_sent("Check your email").unwrap();

        let form = LoginForm::from_flow(&flow, LoginMode::Register, true);
        let message = form.message.unwrap();
        assert_eq!(message.kind, MessageKind::Success);
        assert_eq!(message.text, "Check your email");
    }

    #[test]
    fn test_login_form_loading_while_authenticating() {
        let mut flow = AuthFlow::new();
        flow.begin_sign_in("teacher@example.com").unwrap();
        assert!(LoginForm::from_flow(&flow, LoginMode::SignIn, true).is_loading);
    }

    #[test]
    fn test_purchase_panel_bundles() {
        let panel = PurchasePanel::default();
        assert_eq!(panel.title, "Fuel Your Forge");
        assert_eq!(panel.bundles.len(), 2);
        assert_eq!(panel.bundles[0].label, "10 Credits | $9.99");
        assert!(!panel.bundles[0].best_value);
        assert!(panel.bundles[1].best_value);
    }
}
