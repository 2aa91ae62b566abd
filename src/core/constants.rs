//! Named constants referenced by spec.md §4 but never numerically derived
//! there. Each is preserved as written where a value *is* given; where §4
//! only names the constant, a value consistent with its described behavior
//! is chosen here and the choice is recorded as an open question in
//! DESIGN.md rather than silently invented.

/// §4.D: minimum spacing between two requests to the same domain, seconds.
pub const DOMAIN_RATE_LIMIT_MIN_SECS: f64 = 2.0;
/// §4.D: jitter added on top of the minimum spacing, uniform range (secs).
pub const DOMAIN_RATE_LIMIT_JITTER_RANGE: (f64, f64) = (0.1, 1.0);

/// §4.D: HTTP statuses that trigger the archive.org retry path. 403 is the
/// standard "forbidden" response; 271 is non-standard and preserved as an
/// open question (§9 "Open questions").
pub const ARCHIVE_RETRY_STATUSES: [u16; 2] = [403, 271];

/// §4.F: per-coordinate coverage cap before renormalization.
pub const DIMENSION_COVERAGE_CAP: f32 = 3.0;
/// §4.F: divisor used to renormalize capped coverage back into [0, 1].
/// Not derived in spec.md; preserved numerically per §9's open question.
pub const DIMENSION_COVERAGE_NORMALIZER: f32 = 3.0;
/// §4.F: PCA component count ceiling (`k = min(10, n_items)`).
pub const DIMENSION_MAX_COMPONENTS: usize = 10;

/// §4.I / GLOSSARY "Trajectory": constant weight applied to the trajectory
/// term of the semantic transform.
pub const TRAJECTORY_MOMENTUM: f32 = 0.15;
/// §4.I / GLOSSARY "Gap vector": constant weight applied to the gap term
/// before its cycle-based fade-out.
pub const GAP_EXPLORATION_WEIGHT: f32 = 0.2;
/// §4.I: ceiling on the sum of pdv/trajectory/gap weights, leaving headroom
/// for the per-eigenvector variance term.
pub const TRANSFORM_WEIGHT_CEILING: f32 = 0.8;

/// §4.K: window-shift factor per repeated selection of the same URL.
pub const REPEAT_WINDOW_FACTOR: f32 = 0.5;
/// §4.K: shrink factor applied to the sliding window after a full pass.
pub const REPEAT_WINDOW_SHRINK: f32 = 0.7;
/// §4.K: minimum window size floor, in tokens.
pub const REPEAT_WINDOW_FLOOR_TOKENS: usize = 200;
/// §4.D / §4.K: default token budget for a single fetched/compressed result.
pub const MAX_RESULT_TOKENS: usize = 2000;

/// §4.L: minimum number of knowledge-store hits before skipping web search.
pub const MIN_LOCAL_SOURCES: usize = 3;
/// §4.L: per-matched-keyword multiplier applied to a candidate's score.
pub const KEYWORD_MULTIPLIER_PER_MATCH: f32 = 1.05;
/// §4.L: ceiling on the compounded keyword multiplier.
pub const MAX_KEYWORD_MULTIPLIER: f32 = 1.5;
/// §4.L: final-similarity clamp.
pub const SIMILARITY_CLAMP: f32 = 0.99;
/// §4.L: base result count before repeat-based additions.
pub const SEARCH_BASE_RESULTS: usize = 8;

/// §4.J: radius (in chunk-index distance) used by the local-influence
/// fallback ranking when eigendecomposition fails.
pub const LOCAL_INFLUENCE_RADIUS: usize = 2;
/// §4.J: cumulative explained-variance target for eigenspace truncation.
pub const COMPRESSOR_VARIANCE_TARGET: f32 = 0.8;
/// §4.J: bounds on the number of retained eigen-components.
pub const COMPRESSOR_COMPONENT_BOUNDS: (usize, usize) = (3, 10);
/// §4.J: PDV-impact threshold above which pdv-alignment enters the score.
pub const COMPRESSOR_PDV_IMPACT_THRESHOLD: f32 = 0.1;
/// §4.J: ceiling on the pdv-alignment contribution to a chunk's score.
pub const COMPRESSOR_PDV_ALIGNMENT_CAP: f32 = 0.3;

/// §4.O: cycle bounds (also overridable via config / MAX_CYCLES env var).
pub const DEFAULT_MIN_CYCLES: u32 = 2;
pub const DEFAULT_MAX_CYCLES: u32 = 6;
/// §4.O: completed-fraction threshold for early termination.
pub const CYCLE_COMPLETION_FRACTION: f32 = 0.7;
/// §4.O: opening query count, and per-cycle per-topic query count.
pub const OPENING_QUERY_COUNT: usize = 8;
pub const CYCLE_QUERY_COUNT: usize = 4;
pub const CYCLE_TOP_TOPICS: usize = 10;

/// §4.A: text is truncated before hashing for cache keys.
pub const EMBEDDING_TEXT_TRUNCATE_CHARS: usize = 2000;

/// §4.Q: floor on per-subtopic citation count `k`.
pub const SYNTHESIS_MIN_CITATIONS: usize = 3;
/// §4.R: batch size for citation verification calls.
pub const CITATION_VERIFY_BATCH: usize = 5;

/// §2.D / §5: HTTP call timeout bounds, seconds.
pub const HTTP_TIMEOUT_SECS: u64 = 20;
/// §5: academic provider per-call timeout.
pub const ACADEMIC_PROVIDER_TIMEOUT_SECS: u64 = 30;
/// §5: phase budget across all academic providers combined.
pub const ACADEMIC_PHASE_BUDGET_SECS: u64 = 60;
/// §5: synthesis LLM call ceiling before falling back to a template.
pub const SYNTHESIS_TIMEOUT_SECS: u64 = 300;

/// §3: tolerance for the unit-norm invariant on cached embeddings.
pub const UNIT_NORM_TOLERANCE: f32 = 1e-6;

/// §9 original_source supplement: content length floor before a fetched
/// source is worth storing in the knowledge base (`deep_storage.py`).
pub const KNOWLEDGE_MIN_CONTENT_LEN: usize = 100;
/// §9 original_source supplement: stored-content truncation length
/// (`deep_storage.py::_clean_content`).
pub const KNOWLEDGE_CONTENT_TRUNCATE_CHARS: usize = 10_000;
