//! Application state and the controller that drives it.
//!
//! [`AppState`] is a plain value; every change goes through
//! [`AppState::apply`]. The [`Controller`] owns the state together with the
//! debouncer, the query sequencer and the sync client, and turns user
//! intents into store calls and state transitions.

use crate::access::Session;
use crate::aggregate::{AggregationEngine, AggregationWindow, CollaboratorAggregate};
use crate::config::AppConfig;
use crate::debounce::Debouncer;
use crate::error::CoreError;
use crate::model::{ProcessRecord, Status, StatusTransition, Treatment};
use crate::query::{ListFilter, ListQueryEngine, Page};
use crate::sequence::{QueryClass, QuerySequencer, QueryTicket};
use crate::store::RecordStore;
use crate::sync::{MutationOutcome, Operation, OptimisticSyncClient};
use crate::workflow::StatusWorkflow;
use chrono::NaiveDate;
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Listing,
    Dashboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    /// The action was refused locally and nothing changed.
    Blocked,
    /// The store failed; the view was reloaded.
    Advisory,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn blocked(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Blocked,
            message: message.into(),
        }
    }

    pub fn advisory(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Advisory,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub view: View,
    /// Search text as typed, before the debounce commits it to `filter`.
    pub search_input: String,
    pub filter: ListFilter,
    pub page: u32,
    pub listing: Page<ProcessRecord>,
    pub window: AggregationWindow,
    pub aggregates: Vec<CollaboratorAggregate>,
    pub editing: Option<ProcessRecord>,
    pub notice: Option<Notice>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SwitchView(View),
    TypeSearch(String),
    SetSearch(Option<String>),
    SetCollaboratorFilter(Option<String>),
    SetTreatmentFilter(Option<Treatment>),
    SetStatusFilter(Option<Status>),
    ClearFilters,
    GoToPage(u32),
    SetWindow(AggregationWindow),
    ListingLoaded(Page<ProcessRecord>),
    DashboardLoaded(Vec<CollaboratorAggregate>),
    OpenRecord(ProcessRecord),
    CloseRecord,
    /// A record changed, optimistically or for real; patch every copy shown.
    RecordChanged(ProcessRecord),
    Notify(Notice),
    DismissNotice,
}

impl AppState {
    #[must_use]
    pub fn new(today: NaiveDate) -> Self {
        Self {
            view: View::default(),
            search_input: String::new(),
            filter: ListFilter::default(),
            page: 1,
            listing: Page::default(),
            window: AggregationWindow::month_to_date(today),
            aggregates: Vec::new(),
            editing: None,
            notice: None,
        }
    }

    /// The state after `action`. Filter and view changes restart at page 1;
    /// a page outside `1..=total_pages` leaves the state unchanged.
    #[must_use]
    pub fn apply(&self, action: Action) -> Self {
        let mut next = self.clone();
        match action {
            Action::SwitchView(view) => {
                next.view = view;
                next.page = 1;
            }
            Action::TypeSearch(text) => next.search_input = text,
            Action::SetSearch(search) => {
                next.search_input = search.clone().unwrap_or_default();
                next.filter.search = search;
                next.page = 1;
            }
            Action::SetCollaboratorFilter(who) => {
                next.filter.responsavel = who;
                next.page = 1;
            }
            Action::SetTreatmentFilter(treatment) => {
                next.filter.tratamento = treatment;
                next.page = 1;
            }
            Action::SetStatusFilter(status) => {
                next.filter.status = status;
                next.page = 1;
            }
            Action::ClearFilters => {
                next.filter = ListFilter::default();
                next.search_input.clear();
                next.page = 1;
            }
            Action::GoToPage(page) => {
                if (1..=self.listing.total_pages).contains(&page) {
                    next.page = page;
                }
            }
            Action::SetWindow(window) => next.window = window,
            Action::ListingLoaded(page) => {
                next.page = page.page;
                next.listing = page;
            }
            Action::DashboardLoaded(aggregates) => next.aggregates = aggregates,
            Action::OpenRecord(record) => next.editing = Some(record),
            Action::CloseRecord => next.editing = None,
            Action::RecordChanged(record) => {
                for item in &mut next.listing.items {
                    if item.nup == record.nup {
                        item.clone_from(&record);
                    }
                }
                if next.editing.as_ref().is_some_and(|e| e.nup == record.nup) {
                    next.editing = Some(record);
                }
            }
            Action::Notify(notice) => next.notice = Some(notice),
            Action::DismissNotice => next.notice = None,
        }
        next
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SearchInput;

pub struct Controller<S> {
    session: Session,
    sync: OptimisticSyncClient<S>,
    listing: ListQueryEngine,
    aggregator: AggregationEngine,
    debouncer: Debouncer<SearchInput, String>,
    sequencer: QuerySequencer,
    state: AppState,
}

impl<S: RecordStore> Controller<S> {
    /// # Errors
    ///
    /// [`CoreError::InvalidConfiguration`] for an unusable listing setup.
    pub fn new(
        session: Session,
        sync: OptimisticSyncClient<S>,
        config: &AppConfig,
        today: NaiveDate,
    ) -> Result<Self, CoreError> {
        Ok(Self {
            session,
            sync,
            listing: ListQueryEngine::new(config.listing.page_size)?,
            aggregator: AggregationEngine,
            debouncer: Debouncer::new(config.search_debounce()),
            sequencer: QuerySequencer::new(),
            state: AppState::new(today),
        })
    }

    pub const fn state(&self) -> &AppState {
        &self.state
    }

    pub const fn session(&self) -> &Session {
        &self.session
    }

    pub const fn sync(&self) -> &OptimisticSyncClient<S> {
        &self.sync
    }

    pub fn dispatch(&mut self, action: Action) {
        self.state = self.state.apply(action);
    }

    fn notify(&mut self, notice: Notice) {
        self.dispatch(Action::Notify(notice));
    }

    // -----------------------------------------------------------------------
    // Listing
    // -----------------------------------------------------------------------

    /// Record a keystroke; the query runs once the input has been quiet for
    /// the debounce window (see [`Self::tick`]).
    pub fn type_search(&mut self, text: &str, now: Instant) {
        self.dispatch(Action::TypeSearch(text.to_string()));
        self.debouncer.schedule(SearchInput, text.to_string(), now);
    }

    /// Fire the search if its quiet period is over. Returns whether a query ran.
    ///
    /// # Errors
    ///
    /// Store failures from the listing refresh.
    pub fn tick(&mut self, now: Instant) -> Result<bool, CoreError> {
        let Some((_, text)) = self.debouncer.take_due(now).pop() else {
            return Ok(false);
        };
        debug!(search = %text, "debounced search fired");
        self.dispatch(Action::SetSearch(Some(text).filter(|t| !t.trim().is_empty())));
        self.refresh_listing()?;
        Ok(true)
    }

    /// Run the typed search now, skipping the rest of the quiet period.
    ///
    /// # Errors
    ///
    /// Store failures from the listing refresh.
    pub fn submit_search(&mut self) -> Result<(), CoreError> {
        self.debouncer.cancel(&SearchInput);
        let text = self.state.search_input.clone();
        self.dispatch(Action::SetSearch(Some(text).filter(|t| !t.trim().is_empty())));
        self.refresh_listing()
    }

    /// Apply a filter action and reload page 1.
    ///
    /// # Errors
    ///
    /// Store failures from the listing refresh.
    pub fn apply_filter(&mut self, action: Action) -> Result<(), CoreError> {
        self.dispatch(action);
        self.refresh_listing()
    }

    /// Move to `page` if it exists. Returns whether the page changed.
    ///
    /// # Errors
    ///
    /// Store failures from the listing refresh.
    pub fn go_to_page(&mut self, page: u32) -> Result<bool, CoreError> {
        let before = self.state.page;
        self.dispatch(Action::GoToPage(page));
        if self.state.page == before {
            return Ok(false);
        }
        self.refresh_listing()?;
        Ok(true)
    }

    /// Start a listing query for the current filter and page.
    pub fn begin_listing(&mut self) -> (QueryTicket, ListFilter, u32) {
        let ticket = self.sequencer.issue(QueryClass::Listing);
        (ticket, self.state.filter.clone(), self.state.page)
    }

    /// Apply a listing response if it is still the latest one.
    /// Returns `Ok(false)` for a discarded stale response.
    ///
    /// # Errors
    ///
    /// The query's own error, after an advisory notice is recorded.
    pub fn complete_listing(
        &mut self,
        ticket: QueryTicket,
        result: Result<Page<ProcessRecord>, CoreError>,
    ) -> Result<bool, CoreError> {
        if !self.sequencer.is_current(ticket) {
            debug!(seq = ticket.seq, "stale listing response discarded");
            return Ok(false);
        }
        match result {
            Ok(page) => {
                self.sync.registry().observe(&page.items);
                self.dispatch(Action::ListingLoaded(page));
                Ok(true)
            }
            Err(err) => {
                self.notify(Notice::advisory(format!("Listing failed: {err}")));
                Err(err)
            }
        }
    }

    /// # Errors
    ///
    /// [`CoreError::Connectivity`] when the store fails.
    pub fn refresh_listing(&mut self) -> Result<(), CoreError> {
        let (ticket, filter, page) = self.begin_listing();
        let result = self.listing.query(self.sync.store(), &filter, page);
        self.complete_listing(ticket, result).map(|_| ())
    }

    // -----------------------------------------------------------------------
    // Dashboard
    // -----------------------------------------------------------------------

    /// # Errors
    ///
    /// [`CoreError::AccessDenied`] for the dashboard as a regular user, or
    /// the refresh error of the new view.
    pub fn switch_view(&mut self, view: View) -> Result<(), CoreError> {
        if view == View::Dashboard {
            self.session.require_admin("productivity dashboard")?;
        }
        self.dispatch(Action::SwitchView(view));
        self.refresh_active_view()
    }

    /// # Errors
    ///
    /// [`CoreError::InvalidWindow`] for an inverted range, or the dashboard
    /// refresh error when that view is active.
    pub fn set_window(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
        finalized: bool,
    ) -> Result<(), CoreError> {
        let window = AggregationWindow::new(start, end, finalized)?;
        self.dispatch(Action::SetWindow(window));
        if self.state.view == View::Dashboard {
            self.refresh_dashboard()?;
        }
        Ok(())
    }

    /// # Errors
    ///
    /// [`CoreError::AccessDenied`] for a regular user.
    pub fn begin_dashboard(&mut self) -> Result<(QueryTicket, AggregationWindow), CoreError> {
        self.session.require_admin("productivity dashboard")?;
        let ticket = self.sequencer.issue(QueryClass::Dashboard);
        Ok((ticket, self.state.window))
    }

    /// # Errors
    ///
    /// The query's own error, after an advisory notice is recorded.
    pub fn complete_dashboard(
        &mut self,
        ticket: QueryTicket,
        result: Result<Vec<CollaboratorAggregate>, CoreError>,
    ) -> Result<bool, CoreError> {
        if !self.sequencer.is_current(ticket) {
            debug!(seq = ticket.seq, "stale dashboard response discarded");
            return Ok(false);
        }
        match result {
            Ok(aggregates) => {
                self.dispatch(Action::DashboardLoaded(aggregates));
                Ok(true)
            }
            Err(err) => {
                self.notify(Notice::advisory(format!("Dashboard failed: {err}")));
                Err(err)
            }
        }
    }

    /// # Errors
    ///
    /// [`CoreError::AccessDenied`] or [`CoreError::Connectivity`].
    pub fn refresh_dashboard(&mut self) -> Result<(), CoreError> {
        let (ticket, window) = self.begin_dashboard()?;
        let result = self.aggregator.aggregate(self.sync.store(), &window);
        self.complete_dashboard(ticket, result).map(|_| ())
    }

    /// # Errors
    ///
    /// The refresh error of the active view.
    pub fn refresh_active_view(&mut self) -> Result<(), CoreError> {
        match self.state.view {
            View::Listing => self.refresh_listing(),
            View::Dashboard => self.refresh_dashboard(),
        }
    }

    // -----------------------------------------------------------------------
    // Editing
    // -----------------------------------------------------------------------

    /// Load `nup` from the store and make it the record under edit.
    ///
    /// # Errors
    ///
    /// [`CoreError::RecordNotFound`] or [`CoreError::Connectivity`].
    pub fn open_record(&mut self, nup: &str) -> Result<&ProcessRecord, CoreError> {
        let record = self
            .sync
            .store()
            .get(nup)?
            .ok_or_else(|| CoreError::RecordNotFound {
                nup: nup.to_string(),
            })?;
        self.dispatch(Action::OpenRecord(record));
        self.state.editing.as_ref().ok_or(CoreError::NoRecordOpen)
    }

    pub fn close_record(&mut self) {
        self.dispatch(Action::CloseRecord);
    }

    /// Statuses the record under edit may move to.
    #[must_use]
    pub fn allowed_targets(&self) -> Vec<Status> {
        self.state
            .editing
            .as_ref()
            .map(StatusWorkflow::allowed_targets)
            .unwrap_or_default()
    }

    /// # Errors
    ///
    /// [`CoreError::NoRecordOpen`], [`CoreError::TransitionDenied`],
    /// [`CoreError::MutationInFlight`] or [`CoreError::Connectivity`].
    pub fn change_status(&mut self, target: Status) -> Result<StatusTransition, CoreError> {
        self.mutate(Operation::ChangeStatus(target))?
            .ok_or(CoreError::NoRecordOpen)
    }

    /// Reassign the record under edit. Administrators only.
    ///
    /// # Errors
    ///
    /// [`CoreError::AccessDenied`], [`CoreError::NoRecordOpen`],
    /// [`CoreError::MutationInFlight`] or [`CoreError::Connectivity`].
    pub fn assign(&mut self, collaborator: &str) -> Result<(), CoreError> {
        self.session.require_admin("collaborator assignment")?;
        self.mutate(Operation::Assign(collaborator.to_string()))
            .map(|_| ())
    }

    fn mutate(&mut self, operation: Operation) -> Result<Option<StatusTransition>, CoreError> {
        let held = self.state.editing.clone().ok_or(CoreError::NoRecordOpen)?;
        let pending = match self.sync.begin(&held, operation, &self.session.principal) {
            Ok(pending) => pending,
            Err(err) => {
                let notice = match &err {
                    CoreError::TransitionDenied { .. } => Notice::blocked(err.to_string()),
                    _ => Notice::advisory(err.to_string()),
                };
                self.notify(notice);
                return Err(err);
            }
        };
        self.dispatch(Action::RecordChanged(pending.speculative().clone()));

        match self.sync.complete(pending) {
            MutationOutcome::Committed { record, transition } => {
                self.dispatch(Action::RecordChanged(record));
                // The write is saved; a failed refresh only leaves the
                // dashboard stale.
                if self.state.view == View::Dashboard {
                    if let Err(refresh) = self.refresh_dashboard() {
                        warn!(error = %refresh, "dashboard refresh after commit failed");
                    }
                }
                Ok(transition)
            }
            MutationOutcome::RolledBack { snapshot, error } => {
                self.dispatch(Action::RecordChanged(snapshot));
                let err = CoreError::Connectivity(error);
                self.notify(Notice::advisory(format!(
                    "Change not saved, view reloaded: {err}"
                )));
                if let Err(refetch) = self.refresh_active_view() {
                    warn!(error = %refetch, "reload after rollback failed");
                }
                Err(err)
            }
        }
    }

    #[must_use]
    pub fn known_collaborators(&self) -> Vec<String> {
        self.sync.registry().known_names()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn with_pages(total_pages: u32) -> AppState {
        let mut state = AppState::new(today());
        state.listing.total_pages = total_pages;
        state
    }

    #[test]
    fn page_outside_range_is_ignored() {
        let state = with_pages(3);
        assert_eq!(state.apply(Action::GoToPage(2)).page, 2);
        assert_eq!(state.apply(Action::GoToPage(0)).page, 1);
        assert_eq!(state.apply(Action::GoToPage(4)).page, 1);
    }

    #[test]
    fn filter_and_view_changes_restart_at_page_one() {
        let state = with_pages(5).apply(Action::GoToPage(4));
        assert_eq!(state.page, 4);
        for action in [
            Action::SetSearch(Some("77".into())),
            Action::SetCollaboratorFilter(Some("Deise".into())),
            Action::SetTreatmentFilter(Some(Treatment::Odonto)),
            Action::SetStatusFilter(Some(Status::Arquivado)),
            Action::ClearFilters,
            Action::SwitchView(View::Dashboard),
        ] {
            assert_eq!(state.apply(action.clone()).page, 1, "{action:?}");
        }
    }

    #[test]
    fn typing_does_not_touch_the_filter() {
        let state = AppState::new(today()).apply(Action::TypeSearch("AB".into()));
        assert_eq!(state.search_input, "AB");
        assert_eq!(state.filter.search, None);
    }

    #[test]
    fn record_change_patches_listing_and_editor() {
        let mut state = AppState::new(today());
        state.listing.items = vec![ProcessRecord::new("1"), ProcessRecord::new("2")];
        let state = state.apply(Action::OpenRecord(ProcessRecord::new("2")));

        let mut changed = ProcessRecord::new("2");
        changed.status = Status::EmAnalise;
        let next = state.apply(Action::RecordChanged(changed.clone()));

        assert_eq!(next.listing.items[1], changed);
        assert_eq!(next.listing.items[0].status, Status::PendenteAuditoria);
        assert_eq!(next.editing, Some(changed));
    }

    #[test]
    fn default_window_is_month_to_date_finalized() {
        let state = AppState::new(today());
        assert_eq!(state.window.start, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(state.window.end, today());
        assert!(state.window.finalized);
    }

    #[test]
    fn apply_leaves_original_untouched() {
        let state = AppState::new(today());
        let _ = state.apply(Action::Notify(Notice::info("saved")));
        assert_eq!(state.notice, None);
    }
}
