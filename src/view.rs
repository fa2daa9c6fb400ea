use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::api::{ApiError, MutationGateway, RecordSource, Resource};
use crate::query::{self, Criteria, Queryable};
use crate::stats::Aggregate;
use crate::validate::{FieldErrors, Validate};

pub const TOAST_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState {
    Loading,
    Ready,
    Submitting,
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
    raised_at: Instant,
}

impl Toast {
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.raised_at) >= TOAST_TTL
    }
}

/// Shared flag that outlives a request; once set, the response is dropped.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Yes/no gate in front of destructive actions.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F: Fn(&str) -> bool> Confirm for F {
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Saved,
    Invalid(FieldErrors),
    Declined,
    Failed(String),
    /// The view was closed while the request was out.
    Discarded,
    /// Mutations are only accepted from `Ready`.
    NotReady,
}

pub struct QueryView<R> {
    state: ViewState,
    records: Vec<R>,
    criteria: Criteria,
    toast: Option<Toast>,
    field_errors: FieldErrors,
    editing: Option<i64>,
    token: CancelToken,
}

impl<R> Default for QueryView<R> {
    fn default() -> Self {
        Self {
            state: ViewState::Loading,
            records: Vec::new(),
            criteria: Criteria::default(),
            toast: None,
            field_errors: FieldErrors::default(),
            editing: None,
            token: CancelToken::default(),
        }
    }
}

impl<R: Queryable + Aggregate> QueryView<R> {
    /// A new view that immediately loads from `source`.
    pub fn open(source: &impl RecordSource<R>) -> Self {
        let mut view = Self::default();
        view.reload(source);
        view
    }

    /// Fetch the whole collection again, replacing what is held.
    pub fn reload(&mut self, source: &impl RecordSource<R>) {
        self.state = ViewState::Loading;
        let token = self.token.clone();
        let result = source.fetch();
        self.apply_fetch(&token, result);
    }

    /// Apply a finished fetch unless the view has since been closed.
    pub fn apply_fetch(&mut self, token: &CancelToken, result: Result<Vec<R>, ApiError>) {
        if token.is_cancelled() {
            debug!("discarding fetch result for closed view");
            return;
        }
        match result {
            Ok(records) => {
                info!(count = records.len(), "collection loaded");
                self.records = records;
                self.state = ViewState::Ready;
            }
            Err(err) => {
                let message = err.user_message();
                warn!(%message, "collection failed to load");
                self.records.clear();
                self.state = ViewState::Failed(message);
            }
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// Everything last fetched; empty unless the view is usable.
    pub fn records(&self) -> &[R] {
        match self.state {
            ViewState::Ready | ViewState::Submitting => &self.records,
            _ => &[],
        }
    }

    pub fn visible(&self) -> Vec<&R> {
        query::filter(self.records(), &self.criteria)
    }

    pub fn stats(&self) -> R::Stats {
        R::aggregate(&self.visible())
    }

    pub fn criteria(&self) -> &Criteria {
        &self.criteria
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.criteria.search = term.into();
    }

    pub fn set_category(&mut self, field: &str, value: impl Into<String>) {
        self.criteria.categories.insert(field.to_string(), value.into());
    }

    pub fn set_criteria(&mut self, criteria: Criteria) {
        self.criteria = criteria;
    }

    pub fn clear_filters(&mut self) {
        self.criteria = Criteria::default();
    }

    /// Dropdown choices for a category field, from the current collection.
    pub fn choices(&self, field: &str) -> Vec<String> {
        query::distinct_values(self.records(), field)
    }

    pub fn cycle_category(&mut self, field: &str) {
        let next = query::cycle(&self.choices(field), self.criteria.selected(field));
        self.set_category(field, next);
    }

    pub fn find(&self, id: i64) -> Option<&R> {
        self.records().iter().find(|r| r.id() == id)
    }

    pub fn toast(&self, now: Instant) -> Option<&Toast> {
        self.toast.as_ref().filter(|t| !t.is_expired(now))
    }

    pub fn expire_toast(&mut self, now: Instant) {
        if self.toast.as_ref().is_some_and(|t| t.is_expired(now)) {
            self.toast = None;
        }
    }

    pub fn notify(&mut self, kind: ToastKind, message: impl Into<String>) {
        self.toast = Some(Toast {
            kind,
            message: message.into(),
            raised_at: Instant::now(),
        });
    }

    pub fn field_errors(&self) -> &FieldErrors {
        &self.field_errors
    }

    pub fn begin_edit(&mut self, id: i64) {
        self.editing = Some(id);
    }

    pub fn editing(&self) -> Option<i64> {
        self.editing
    }

    /// Tear down: pending responses are dropped and the toast goes away.
    pub fn close(&mut self) {
        self.token.cancel();
        self.toast = None;
    }
}

impl<R: Queryable + Aggregate + Resource> QueryView<R> {
    pub fn create<G>(&mut self, gateway: &G, draft: &R::Draft) -> Outcome
    where
        G: RecordSource<R> + MutationGateway<R>,
    {
        self.submit(gateway, Some(draft), "added", |g| g.create(draft))
    }

    pub fn update<G>(&mut self, gateway: &G, id: i64, draft: &R::Draft) -> Outcome
    where
        G: RecordSource<R> + MutationGateway<R>,
    {
        self.update_as(gateway, id, draft, "updated")
    }

    /// `update` with a specific verb in the success toast, e.g. "approved".
    pub fn update_as<G>(&mut self, gateway: &G, id: i64, draft: &R::Draft, done: &str) -> Outcome
    where
        G: RecordSource<R> + MutationGateway<R>,
    {
        self.submit(gateway, Some(draft), done, |g| g.update(id, draft))
    }

    pub fn delete<G>(&mut self, gateway: &G, id: i64, confirm: &dyn Confirm) -> Outcome
    where
        G: RecordSource<R> + MutationGateway<R>,
    {
        if self.state != ViewState::Ready {
            return Outcome::NotReady;
        }
        let prompt = format!(
            "Are you sure you want to delete this {}? This action cannot be undone.",
            R::LABEL.to_lowercase()
        );
        if !confirm.confirm(&prompt) {
            return Outcome::Declined;
        }
        self.submit(gateway, None, "deleted", |g| MutationGateway::<R>::delete(g, id))
    }

    fn submit<G>(
        &mut self,
        gateway: &G,
        draft: Option<&R::Draft>,
        done: &str,
        call: impl FnOnce(&G) -> Result<(), ApiError>,
    ) -> Outcome
    where
        G: RecordSource<R> + MutationGateway<R>,
    {
        if let Some(draft) = draft {
            let errors = draft.validate();
            if !errors.is_empty() {
                self.field_errors = errors.clone();
                self.notify(ToastKind::Error, "Please fix the form errors");
                return Outcome::Invalid(errors);
            }
        }
        self.field_errors = FieldErrors::default();
        if self.state != ViewState::Ready {
            return Outcome::NotReady;
        }

        let token = self.token.clone();
        self.state = ViewState::Submitting;
        let result = call(gateway);
        if token.is_cancelled() {
            debug!("discarding mutation result for closed view");
            return Outcome::Discarded;
        }
        self.state = ViewState::Ready;

        match result {
            Ok(()) => {
                info!(resource = R::PATH, done, "mutation succeeded");
                self.notify(ToastKind::Success, format!("{} {} successfully!", R::LABEL, done));
                self.editing = None;
                self.reload(gateway);
                Outcome::Saved
            }
            Err(err) => {
                let message = err.user_message();
                warn!(resource = R::PATH, %message, "mutation failed");
                self.notify(ToastKind::Error, format!("Error: {}", message));
                Outcome::Failed(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Department, DepartmentDraft};
    use crate::query::ALL;
    use std::cell::{Cell, RefCell};

    /// Backend stand-in: writes land in `store`, the view only sees them
    /// after a fetch.
    #[derive(Default)]
    struct FakeBackend {
        store: RefCell<Vec<Department>>,
        fetches: Cell<usize>,
        writes: Cell<usize>,
        fail_fetch: Cell<bool>,
        fail_write: RefCell<Option<Option<String>>>,
    }

    impl FakeBackend {
        fn with(names: &[&str]) -> Self {
            let backend = Self::default();
            for (i, name) in names.iter().enumerate() {
                backend.store.borrow_mut().push(dept(i as i64 + 1, name));
            }
            backend
        }

        fn write(&self, apply: impl FnOnce(&mut Vec<Department>)) -> Result<(), ApiError> {
            self.writes.set(self.writes.get() + 1);
            if let Some(message) = self.fail_write.borrow().clone() {
                return Err(ApiError::Status { status: 400, message });
            }
            apply(&mut self.store.borrow_mut());
            Ok(())
        }
    }

    impl RecordSource<Department> for FakeBackend {
        fn fetch(&self) -> Result<Vec<Department>, ApiError> {
            self.fetches.set(self.fetches.get() + 1);
            if self.fail_fetch.get() {
                return Err(ApiError::Status {
                    status: 503,
                    message: Some("Service unavailable".to_string()),
                });
            }
            Ok(self.store.borrow().clone())
        }
    }

    impl MutationGateway<Department> for FakeBackend {
        fn create(&self, draft: &DepartmentDraft) -> Result<(), ApiError> {
            self.write(|store| {
                let id = store.iter().map(|d| d.id).max().unwrap_or(0) + 1;
                store.push(Department {
                    id,
                    name: draft.name.clone(),
                    description: draft.description.clone(),
                    head: draft.head.clone(),
                });
            })
        }

        fn update(&self, id: i64, draft: &DepartmentDraft) -> Result<(), ApiError> {
            self.write(|store| {
                if let Some(d) = store.iter_mut().find(|d| d.id == id) {
                    d.name = draft.name.clone();
                }
            })
        }

        fn delete(&self, id: i64) -> Result<(), ApiError> {
            self.write(|store| store.retain(|d| d.id != id))
        }
    }

    /// Closes the view (via its token) while the fetch is in flight.
    struct ClosingSource<'a> {
        inner: &'a FakeBackend,
        token: RefCell<Option<CancelToken>>,
    }

    impl RecordSource<Department> for ClosingSource<'_> {
        fn fetch(&self) -> Result<Vec<Department>, ApiError> {
            if let Some(token) = self.token.borrow().as_ref() {
                token.cancel();
            }
            self.inner.fetch()
        }
    }

    fn dept(id: i64, name: &str) -> Department {
        Department {
            id,
            name: name.to_string(),
            description: None,
            head: None,
        }
    }

    fn draft(name: &str) -> DepartmentDraft {
        DepartmentDraft {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn yes(_: &str) -> bool {
        true
    }

    fn no(_: &str) -> bool {
        false
    }

    #[test]
    fn test_open_fetches_once_and_is_ready() {
        let backend = FakeBackend::with(&["Engineering", "Sales"]);
        let view: QueryView<Department> = QueryView::open(&backend);
        assert_eq!(view.state(), &ViewState::Ready);
        assert_eq!(backend.fetches.get(), 1);
        assert_eq!(view.visible().len(), 2);
        assert_eq!(view.stats().total, 2);
    }

    #[test]
    fn test_failed_fetch_shows_no_data() {
        let backend = FakeBackend::with(&["Engineering"]);
        backend.fail_fetch.set(true);
        let view: QueryView<Department> = QueryView::open(&backend);
        assert_eq!(view.state(), &ViewState::Failed("Service unavailable".to_string()));
        assert!(view.visible().is_empty());
        assert_eq!(backend.fetches.get(), 1);
    }

    #[test]
    fn test_filter_changes_do_not_touch_the_network() {
        let backend = FakeBackend::with(&["Engineering", "Sales", "Support"]);
        let mut view: QueryView<Department> = QueryView::open(&backend);
        view.set_search("s");
        assert_eq!(view.visible().len(), 2);
        assert_eq!(view.stats().total, 2);
        view.set_search("");
        assert_eq!(view.visible().len(), 3);
        assert_eq!(backend.fetches.get(), 1);
    }

    #[test]
    fn test_short_name_is_rejected_without_network() {
        let backend = FakeBackend::with(&[]);
        let mut view: QueryView<Department> = QueryView::open(&backend);
        let outcome = view.create(&backend, &draft("A"));

        let Outcome::Invalid(errors) = outcome else {
            panic!("expected validation failure");
        };
        assert_eq!(errors.get("name"), Some("Name must be at least 2 characters"));
        assert_eq!(view.field_errors().get("name"), Some("Name must be at least 2 characters"));
        assert_eq!(backend.writes.get(), 0);
        assert_eq!(backend.fetches.get(), 1);
        let toast = view.toast(Instant::now()).unwrap();
        assert_eq!(toast.kind, ToastKind::Error);
        assert_eq!(view.state(), &ViewState::Ready);
    }

    #[test]
    fn test_create_refetches_and_clears_editing() {
        let backend = FakeBackend::with(&["Engineering"]);
        let mut view: QueryView<Department> = QueryView::open(&backend);
        view.begin_edit(1);

        assert_eq!(view.create(&backend, &draft("Finance")), Outcome::Saved);
        assert_eq!(backend.fetches.get(), 2);
        assert_eq!(view.visible().len(), 2);
        assert_eq!(view.editing(), None);
        assert!(view.field_errors().is_empty());
        let toast = view.toast(Instant::now()).unwrap();
        assert_eq!(toast.kind, ToastKind::Success);
        assert_eq!(toast.message, "Department added successfully!");
    }

    #[test]
    fn test_update_is_only_visible_after_refetch() {
        let backend = FakeBackend::with(&["Engineering"]);
        let mut view: QueryView<Department> = QueryView::open(&backend);
        let held = view.records()[0].clone();

        assert_eq!(view.update(&backend, 1, &draft("Platform")), Outcome::Saved);
        assert_eq!(view.records()[0].name, "Platform");
        assert_ne!(held, view.records()[0]);
    }

    #[test]
    fn test_failed_mutation_leaves_collection_alone() {
        let backend = FakeBackend::with(&["Engineering"]);
        let mut view: QueryView<Department> = QueryView::open(&backend);
        *backend.fail_write.borrow_mut() = Some(Some("Department already exists".to_string()));

        let outcome = view.create(&backend, &draft("Engineering"));
        assert_eq!(outcome, Outcome::Failed("Department already exists".to_string()));
        assert_eq!(backend.fetches.get(), 1);
        assert_eq!(view.visible().len(), 1);
        assert_eq!(view.state(), &ViewState::Ready);
        assert_eq!(
            view.toast(Instant::now()).unwrap().message,
            "Error: Department already exists"
        );
    }

    #[test]
    fn test_failed_mutation_without_backend_message() {
        let backend = FakeBackend::with(&["Engineering"]);
        let mut view: QueryView<Department> = QueryView::open(&backend);
        *backend.fail_write.borrow_mut() = Some(None);
        let outcome = view.delete(&backend, 1, &yes);
        assert_eq!(outcome, Outcome::Failed("request failed with status 400".to_string()));
    }

    #[test]
    fn test_declined_delete_issues_no_call() {
        let backend = FakeBackend::with(&["Engineering", "Sales"]);
        let mut view: QueryView<Department> = QueryView::open(&backend);
        assert_eq!(view.delete(&backend, 1, &no), Outcome::Declined);
        assert_eq!(backend.writes.get(), 0);
        assert_eq!(backend.fetches.get(), 1);
        assert_eq!(view.visible().len(), 2);
    }

    #[test]
    fn test_confirmed_delete_refetches() {
        let backend = FakeBackend::with(&["Engineering", "Sales"]);
        let mut view: QueryView<Department> = QueryView::open(&backend);
        let asked = RefCell::new(String::new());
        let confirm = |prompt: &str| {
            *asked.borrow_mut() = prompt.to_string();
            true
        };
        assert_eq!(view.delete(&backend, 1, &confirm), Outcome::Saved);
        assert!(asked.borrow().contains("delete this department"));
        assert_eq!(view.visible().len(), 1);
        assert!(view.find(1).is_none());
        assert!(view.find(2).is_some());
    }

    #[test]
    fn test_mutations_need_ready_state() {
        let backend = FakeBackend::with(&["Engineering"]);
        backend.fail_fetch.set(true);
        let mut view: QueryView<Department> = QueryView::open(&backend);
        assert_eq!(view.create(&backend, &draft("Finance")), Outcome::NotReady);
        assert_eq!(view.delete(&backend, 1, &yes), Outcome::NotReady);
        assert_eq!(backend.writes.get(), 0);
    }

    #[test]
    fn test_invalid_draft_is_reported_even_when_load_failed() {
        let backend = FakeBackend::with(&["Engineering"]);
        backend.fail_fetch.set(true);
        let mut view: QueryView<Department> = QueryView::open(&backend);
        let Outcome::Invalid(errors) = view.create(&backend, &draft("A")) else {
            panic!("expected validation failure");
        };
        assert_eq!(errors.get("name"), Some("Name must be at least 2 characters"));
        assert_eq!(backend.writes.get(), 0);
        assert!(matches!(view.state(), ViewState::Failed(_)));
    }

    #[test]
    fn test_update_as_names_the_action_in_toast() {
        let backend = FakeBackend::with(&["Engineering"]);
        let mut view: QueryView<Department> = QueryView::open(&backend);
        assert_eq!(
            view.update_as(&backend, 1, &draft("Platform"), "approved"),
            Outcome::Saved
        );
        let toast = view.toast(Instant::now()).unwrap();
        assert_eq!(toast.message, "Department approved successfully!");
    }

    #[test]
    fn test_failed_view_recovers_on_explicit_reload() {
        let backend = FakeBackend::with(&["Engineering"]);
        backend.fail_fetch.set(true);
        let mut view: QueryView<Department> = QueryView::open(&backend);
        backend.fail_fetch.set(false);
        view.reload(&backend);
        assert_eq!(view.state(), &ViewState::Ready);
        assert_eq!(view.visible().len(), 1);
    }

    #[test]
    fn test_response_after_close_is_discarded() {
        let backend = FakeBackend::with(&["Engineering"]);
        let mut view: QueryView<Department> = QueryView::open(&backend);
        let source = ClosingSource {
            inner: &backend,
            token: RefCell::new(Some(view.token.clone())),
        };
        backend.store.borrow_mut().push(dept(2, "Sales"));

        view.reload(&source);
        assert_eq!(view.state(), &ViewState::Loading);
        assert_eq!(view.records().len(), 0);
        assert_eq!(backend.fetches.get(), 2);
    }

    #[test]
    fn test_apply_fetch_with_cancelled_token_changes_nothing() {
        let backend = FakeBackend::with(&["Engineering"]);
        let mut view: QueryView<Department> = QueryView::open(&backend);
        let token = view.token.clone();
        view.close();
        view.apply_fetch(&token, Ok(vec![dept(9, "Late")]));
        assert!(view.find(9).is_none());
        assert_eq!(view.state(), &ViewState::Ready);
    }

    #[test]
    fn test_toast_expires_after_five_seconds_and_is_replaced() {
        let backend = FakeBackend::with(&[]);
        let mut view: QueryView<Department> = QueryView::open(&backend);
        view.notify(ToastKind::Info, "first");
        view.notify(ToastKind::Error, "second");
        let now = Instant::now();
        assert_eq!(view.toast(now).unwrap().message, "second");
        assert!(view.toast(now + TOAST_TTL).is_none());
        view.expire_toast(now + Duration::from_secs(6));
        assert!(view.toast(now).is_none());
    }

    #[test]
    fn test_close_clears_toast() {
        let backend = FakeBackend::with(&[]);
        let mut view: QueryView<Department> = QueryView::open(&backend);
        view.notify(ToastKind::Success, "saved");
        view.close();
        assert!(view.toast(Instant::now()).is_none());
    }

    #[test]
    fn test_category_choices_follow_the_collection() {
        use crate::models::{LeaveRequest, LeaveStatus};
        use chrono::NaiveDate;

        struct Leaves(Vec<LeaveRequest>);
        impl RecordSource<LeaveRequest> for Leaves {
            fn fetch(&self) -> Result<Vec<LeaveRequest>, ApiError> {
                Ok(self.0.clone())
            }
        }
        let day = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let leave = |id, kind: &str, status| LeaveRequest {
            id,
            employee_id: id,
            employee_name: None,
            leave_type: kind.to_string(),
            start_date: day,
            end_date: day,
            status,
        };
        let source = Leaves(vec![
            leave(1, "Sick", LeaveStatus::Pending),
            leave(2, "Casual", LeaveStatus::Approved),
            leave(3, "Sick", LeaveStatus::Approved),
        ]);

        let mut view: QueryView<LeaveRequest> = QueryView::open(&source);
        assert_eq!(view.choices("type"), vec!["All", "Sick", "Casual"]);
        view.cycle_category("type");
        assert_eq!(view.criteria().selected("type"), "Sick");
        view.set_category("status", "Approved");
        assert_eq!(view.visible().len(), 1);
        assert_eq!(view.stats().approved, 1);
        view.cycle_category("type");
        view.cycle_category("type");
        assert_eq!(view.criteria().selected("type"), ALL);
        assert_eq!(view.visible().len(), 2);
        view.clear_filters();
        assert_eq!(view.visible().len(), 3);
        view.set_criteria(Criteria::default().on(Some(day)));
        assert_eq!(view.visible().len(), 3);
    }
}
