use axum::extract::FromRef;
use fxhash::FxHashMap;
use parley_database::Database;
use parley_domain::config::ApiConfig;
use parley_domain::registry::{FeatureSlice, InitializedSlice};
use parley_events::SubscriptionRegistry;
use std::any::TypeId;
use std::borrow::Cow;
use std::ops::Deref;
use std::sync::Arc;

#[parley_derive::parley_error]
pub enum ApiStateError {
    #[error("State validation error{}: {message}", format_context(.context))]
    Validation { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
    #[error("State missing feature slice{}: {message}", format_context(.context))]
    MissingSlice { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

#[derive(Debug)]
pub struct ApiStateInner {
    pub config: ApiConfig,
    pub database: Database,
    /// Process-wide live comment fan-out.
    pub subscriptions: SubscriptionRegistry,
    slices: FxHashMap<TypeId, InitializedSlice>,
}

/// Router state shared by every handler.
#[derive(Debug, Clone)]
pub struct ApiState {
    inner: Arc<ApiStateInner>,
}

impl ApiState {
    #[must_use]
    pub fn builder() -> ApiStateBuilder {
        ApiStateBuilder::default()
    }

    #[must_use]
    pub fn get_slice<T: FeatureSlice>(&self) -> Option<&T> {
        self.inner.slices.get(&TypeId::of::<T>()).and_then(InitializedSlice::downcast::<T>)
    }

    /// Returns a reference to the slice if it is registered.
    ///
    /// # Errors
    /// Returns an error if the slice is not registered.
    pub fn try_get_slice<T: FeatureSlice>(&self) -> Result<&T, ApiStateError> {
        self.get_slice::<T>().ok_or_else(|| ApiStateError::MissingSlice {
            message: std::any::type_name::<T>().into(),
            context: None,
        })
    }

    /// Registered slice names (for diagnostics).
    pub fn slice_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.inner.slices.values().map(|slice| slice.name)
    }
}

impl Deref for ApiState {
    type Target = ApiStateInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl FromRef<ApiState> for ApiConfig {
    fn from_ref(state: &ApiState) -> Self {
        state.inner.config.clone()
    }
}

impl FromRef<ApiState> for Database {
    fn from_ref(state: &ApiState) -> Self {
        state.inner.database.clone()
    }
}

impl FromRef<ApiState> for SubscriptionRegistry {
    fn from_ref(state: &ApiState) -> Self {
        state.inner.subscriptions.clone()
    }
}

#[derive(Debug, Default)]
pub struct ApiStateBuilder {
    config: Option<ApiConfig>,
    database: Option<Database>,
    subscriptions: Option<SubscriptionRegistry>,
    slices: FxHashMap<TypeId, InitializedSlice>,
}

impl ApiStateBuilder {
    #[must_use]
    pub fn config(mut self, config: ApiConfig) -> Self {
        self.config = Some(config);
        self
    }

    #[must_use]
    pub fn db(mut self, database: Database) -> Self {
        self.database = Some(database);
        self
    }

    /// Shares an existing registry; otherwise one is built from `config.subscriptions`.
    #[must_use]
    pub fn subscriptions(mut self, subscriptions: SubscriptionRegistry) -> Self {
        self.subscriptions = Some(subscriptions);
        self
    }

    #[must_use]
    pub fn register_slice(mut self, slice: InitializedSlice) -> Self {
        self.slices.insert(slice.id, slice);
        self
    }

    /// Registers multiple slices at once.
    #[must_use]
    pub fn register_slices<I>(mut self, slices: I) -> Self
    where
        I: IntoIterator<Item = InitializedSlice>,
    {
        self.slices.extend(slices.into_iter().map(|slice| (slice.id, slice)));
        self
    }

    /// # Errors
    /// [`ApiStateError::Validation`] when config or database is missing, or the
    /// configured subscription buffer is invalid.
    pub fn build(self) -> Result<ApiState, ApiStateError> {
        let config = self.config.ok_or_else(|| ApiStateError::Validation {
            message: "ApiConfig not provided".into(),
            context: None,
        })?;
        let database = self.database.ok_or_else(|| ApiStateError::Validation {
            message: "Database not provided".into(),
            context: None,
        })?;
        let subscriptions = match self.subscriptions {
            Some(registry) => registry,
            None => SubscriptionRegistry::new(config.subscriptions).map_err(|e| {
                ApiStateError::Validation {
                    message: e.to_string().into(),
                    context: Some("Building subscription registry".into()),
                }
            })?,
        };

        Ok(ApiState {
            inner: Arc::new(ApiStateInner {
                config,
                database,
                subscriptions,
                slices: self.slices,
            }),
        })
    }
}
