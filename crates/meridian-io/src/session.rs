//! Single-operator editing session.
//!
//! A [`Session`] holds the loaded diagram, its classification, the
//! current mode and selected category, and the mapping being edited.
//! Every edit is persisted immediately; a failed write is logged and
//! the in-memory state stays authoritative.

use chrono::Utc;

use meridian_core::{
    AutoMapError, Category, Classification, ClassifierConfig, ClassifyError, Mapping, MappingMode,
    SegmentId, auto_map_by_color, classify, reconcile,
};
use meridian_export::{BlobError, KeyValueStore, decode, encode, load, save};

use crate::fetch::{FetchError, FetchGuard, SvgSource, Ticket};

/// Errors surfaced to the operator by a [`Session`].
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The operation needs a loaded diagram.
    #[error("no diagram loaded")]
    NoDiagram,

    /// The diagram could not be fetched.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The diagram could not be parsed.
    #[error(transparent)]
    Classify(#[from] ClassifyError),

    /// Auto-mapping was refused; the mapping is unchanged.
    #[error(transparent)]
    AutoMap(#[from] AutoMapError),

    /// An imported mapping was rejected; the mapping is unchanged.
    #[error("import rejected: {0}")]
    Import(#[source] BlobError),

    /// The mapping could not be serialized for export.
    #[error("export failed: {0}")]
    Export(#[source] BlobError),
}

/// Result of a diagram load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The diagram is now current.
    Loaded {
        /// The stored mapping needed repair against this diagram.
        repaired: bool,
    },
    /// A later fetch superseded this one; nothing changed.
    Stale,
}

/// Effect of clicking a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// The segment was added to the category.
    Added(Category),
    /// The segment was removed from the category.
    Removed(Category),
    /// Nothing selected, unknown identifier, or noise.
    Ignored,
}

/// Editing state for one operator.
#[derive(Debug)]
pub struct Session<S> {
    store: S,
    config: ClassifierConfig,
    guard: FetchGuard,
    source_ref: Option<String>,
    mode: MappingMode,
    selected: Option<Category>,
    classification: Classification,
    mapping: Mapping,
}

impl<S: KeyValueStore> Session<S> {
    /// A session with no diagram, in principal mode.
    pub fn new(store: S, config: ClassifierConfig) -> Self {
        let mode = MappingMode::default();
        Self {
            store,
            config,
            guard: FetchGuard::new(),
            source_ref: None,
            mode,
            selected: None,
            classification: Classification::default(),
            mapping: Mapping::empty(mode),
        }
    }

    /// The backing store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Classifier settings.
    pub const fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Path of the loaded diagram.
    pub fn source_ref(&self) -> Option<&str> {
        self.source_ref.as_deref()
    }

    /// Current mapping space.
    pub const fn mode(&self) -> MappingMode {
        self.mode
    }

    /// Category that clicks assign to.
    pub const fn selected(&self) -> Option<Category> {
        self.selected
    }

    /// Classification of the loaded diagram.
    pub const fn classification(&self) -> &Classification {
        &self.classification
    }

    /// The mapping for the current mode.
    pub const fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    /// Start a fetch. Any fetch begun earlier becomes stale.
    pub fn begin_fetch(&mut self) -> Ticket {
        self.guard.begin()
    }

    /// Complete a fetch begun with [`begin_fetch`](Self::begin_fetch).
    ///
    /// # Errors
    ///
    /// Returns the fetch or classification error of a current fetch.
    /// Stale results are dropped without error.
    pub fn finish_fetch(
        &mut self,
        ticket: Ticket,
        source_ref: &str,
        result: Result<String, FetchError>,
    ) -> Result<LoadOutcome, SessionError> {
        let Some(result) = self.guard.accept(ticket, result) else {
            return Ok(LoadOutcome::Stale);
        };
        self.load_svg(source_ref, &result?)
    }

    /// Fetch `path` from `source` and load it.
    ///
    /// # Errors
    ///
    /// See [`finish_fetch`](Self::finish_fetch).
    pub fn open(
        &mut self,
        source: &impl SvgSource,
        path: &str,
    ) -> Result<LoadOutcome, SessionError> {
        let ticket = self.begin_fetch();
        let result = source.fetch(path);
        self.finish_fetch(ticket, path, result)
    }

    /// Classify `svg_text` and make it the current diagram, loading and
    /// repairing its stored mapping for the current mode.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Classify`] and leaves the session
    /// unchanged if the text is not SVG.
    pub fn load_svg(
        &mut self,
        source_ref: &str,
        svg_text: &str,
    ) -> Result<LoadOutcome, SessionError> {
        let classification = classify(svg_text, &self.config)?;
        tracing::info!(
            source = source_ref,
            segments = classification.len(),
            mappable = classification.mappable().count(),
            "loaded diagram"
        );
        self.classification = classification;
        self.source_ref = Some(source_ref.to_string());
        let repaired = self.load_mapping();
        Ok(LoadOutcome::Loaded { repaired })
    }

    /// Switch to another mapping space. The selection is kept only if
    /// the category belongs to the new mode.
    pub fn switch_mode(&mut self, mode: MappingMode) {
        self.mode = mode;
        self.selected = self.selected.filter(|c| mode.contains(*c));
        self.load_mapping();
    }

    /// Select the category clicks assign to. Returns `false` and keeps
    /// the previous selection if `category` is not in the current mode.
    pub fn select(&mut self, category: Category) -> bool {
        if !self.mode.contains(category) {
            return false;
        }
        self.selected = Some(category);
        true
    }

    /// Toggle segment `id` in the selected category, first removing it
    /// from any other category.
    pub fn click(&mut self, id: &str) -> ClickOutcome {
        let Some(category) = self.selected else {
            tracing::debug!(id, "click ignored, no category selected");
            return ClickOutcome::Ignored;
        };
        match self.classification.get(id) {
            Some(segment) if !segment.is_noise() => {}
            _ => {
                tracing::debug!(id, "click ignored, not a mappable segment");
                return ClickOutcome::Ignored;
            }
        }

        let id = SegmentId::new(id);
        let was_member = self.mapping.get(category).contains(&id);
        self.mapping = self.mapping.toggle_exclusive(category, &id);
        self.persist();
        if was_member {
            ClickOutcome::Removed(category)
        } else {
            ClickOutcome::Added(category)
        }
    }

    /// Replace the mapping with a draft grouped by stroke color.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AutoMap`] and leaves the mapping
    /// untouched if the mode or diagram does not support it.
    pub fn auto_map(&mut self) -> Result<(), SessionError> {
        if self.source_ref.is_none() {
            return Err(SessionError::NoDiagram);
        }
        let draft = auto_map_by_color(
            self.classification.segments(),
            self.mode,
            self.config.neutral_threshold,
        )?;
        tracing::info!(segments = draft.total(), "auto-mapped by color");
        self.mapping = draft;
        self.persist();
        Ok(())
    }

    /// Empty every category of the current mode.
    pub fn clear(&mut self) {
        self.mapping = self.mapping.clear();
        self.persist();
    }

    /// Serialize the current mapping for download.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoDiagram`] before a diagram is loaded.
    pub fn export(&self) -> Result<String, SessionError> {
        let source_ref = self.source_ref.as_deref().ok_or(SessionError::NoDiagram)?;
        encode(&self.mapping, source_ref, Utc::now()).map_err(SessionError::Export)
    }

    /// Replace the current mapping with an exported one. Returns `true`
    /// if the import needed repair against the loaded diagram.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Import`] and leaves the mapping untouched
    /// if the blob is malformed or belongs to another diagram or mode.
    pub fn import(&mut self, text: &str) -> Result<bool, SessionError> {
        let source_ref = self.source_ref.as_deref().ok_or(SessionError::NoDiagram)?;
        let imported = decode(text, source_ref, self.mode).map_err(SessionError::Import)?;
        let repaired = reconcile(
            &imported,
            &self.classification.known(),
            &self.classification.noise(),
        );
        self.mapping = repaired.mapping;
        self.persist();
        Ok(repaired.changed)
    }

    /// Load the current mode's stored mapping and repair it. Writes the
    /// repaired mapping back when anything changed.
    fn load_mapping(&mut self) -> bool {
        let Some(source_ref) = self.source_ref.as_deref() else {
            self.mapping = Mapping::empty(self.mode);
            return false;
        };
        let stored = load(&self.store, source_ref, self.mode);
        let repaired = reconcile(
            &stored,
            &self.classification.known(),
            &self.classification.noise(),
        );
        self.mapping = repaired.mapping;
        if repaired.changed {
            self.persist();
        }
        repaired.changed
    }

    fn persist(&mut self) {
        let Some(source_ref) = self.source_ref.as_deref() else {
            return;
        };
        if let Err(e) = save(&mut self.store, source_ref, &self.mapping, Utc::now()) {
            tracing::warn!(error = %e, source = source_ref, "failed to save mapping");
        }
    }
}
