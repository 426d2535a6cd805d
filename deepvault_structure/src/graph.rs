// Piece arena, collision index, and the growth loop.
//
// A `PieceGraph` owns the accepted pieces of one structure in acceptance
// order, plus the queue of pieces still waiting to be expanded. Growth
// is a worklist algorithm: remove a pending piece at a uniformly random
// index, ask the expander for candidate children, gate each candidate
// (depth, horizontal range, floor height, collision), accept the
// survivors. Rejection is silent; the structure just ends up smaller.
//
// The random-index removal is bit-for-bit load-bearing: it is what
// spreads growth across the whole frontier instead of depth-first down
// one branch, and the draw it consumes is part of the deterministic RNG
// stream. `Vec::remove` keeps the queue order stable for the survivors.
//
// Collision is a linear scan over accepted boxes with open-interior
// semantics. Piece counts are small (tens to low hundreds) and the scan
// is cache-friendly; no spatial index is warranted.
//
// **Critical constraint: determinism.** Growth is a pure function of
// (expander, seed, anchor, config). Iteration is over Vecs in insertion
// order; the only randomness is the explicit `WorldgenRng` parameter.
//
// See also: `catalog.rs` for the production `Expander`, `assemble.rs`
// for the retry-wrapped entry points.

use deepvault_prng::WorldgenRng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::bounds::BoundingBox;
use crate::config::AssemblyConfig;
use crate::piece::{Piece, PieceKind};
use crate::types::BlockPos;

/// Index of a piece within its graph's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PieceHandle(u32);

impl PieceHandle {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Errors from structure assembly and persistence.
#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    #[error("mandatory piece failed to place in {attempts} attempts")]
    MandatoryPieceMissing { attempts: u32 },
    #[error("piece graph persistence failed: {0}")]
    Persist(#[from] serde_json::Error),
}

/// Candidate buffer handed to expanders. Most pieces produce at most
/// three children (forward plus two side exits).
pub type CandidateBuf = SmallVec<[Piece; 4]>;

/// Source of candidate children during growth. The production
/// implementation is `catalog::CatalogExpander`; tests drive growth with
/// scripted candidate lists.
pub trait Expander {
    /// Propose children for `parent`. Candidates go into `out`; the
    /// growth loop applies the acceptance gates, so expanders are free
    /// to propose optimistically. The graph is available read-only for
    /// footprint probing (e.g. trying a large box before a small one).
    fn expand(
        &mut self,
        graph: &PieceGraph,
        parent: &Piece,
        rng: &mut WorldgenRng,
        out: &mut CandidateBuf,
    );
}

/// Accepted pieces of one structure, in acceptance order, plus the
/// pending expansion queue.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PieceGraph {
    pieces: Vec<Piece>,
    pending: Vec<PieceHandle>,
}

impl PieceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept a piece: append to the arena and enqueue it for expansion.
    pub fn push(&mut self, piece: Piece) -> PieceHandle {
        let handle = PieceHandle(self.pieces.len() as u32);
        self.pieces.push(piece);
        self.pending.push(handle);
        handle
    }

    pub fn get(&self, handle: PieceHandle) -> &Piece {
        &self.pieces[handle.index()]
    }

    pub fn get_mut(&mut self, handle: PieceHandle) -> &mut Piece {
        &mut self.pieces[handle.index()]
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn pieces_mut(&mut self) -> &mut [Piece] {
        &mut self.pieces
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// True when `bounds` overlaps the interior of any accepted piece.
    /// Face-flush contact is allowed.
    pub fn collides(&self, bounds: &BoundingBox) -> bool {
        self.pieces.iter().any(|p| p.bounds.intersects(bounds))
    }

    /// Union of all accepted piece boxes.
    pub fn aggregate_bounds(&self) -> Option<BoundingBox> {
        BoundingBox::encapsulating(self.pieces.iter().map(|p| &p.bounds))
    }

    /// True when the graph contains the mandatory terminal room.
    pub fn has_vault_room(&self) -> bool {
        self.pieces
            .iter()
            .any(|p| matches!(p.kind, PieceKind::VaultRoom { .. }))
    }

    /// Run the growth loop until the pending queue drains or the piece
    /// ceiling is hit. The graph must already contain at least the root
    /// piece.
    pub fn grow(
        &mut self,
        expander: &mut impl Expander,
        rng: &mut WorldgenRng,
        anchor: BlockPos,
        config: &AssemblyConfig,
    ) {
        let mut candidates = CandidateBuf::new();
        while !self.pending.is_empty() {
            if self.pieces.len() >= config.max_pieces {
                log::debug!("growth stopped at piece ceiling {}", config.max_pieces);
                break;
            }
            let slot = rng.next_index(self.pending.len());
            let parent = self.pending.remove(slot);
            let parent_piece = self.pieces[parent.index()].clone();

            candidates.clear();
            expander.expand(self, &parent_piece, rng, &mut candidates);
            for candidate in candidates.drain(..) {
                if self.pieces.len() >= config.max_pieces {
                    break;
                }
                if self.accepts(&candidate, anchor, config) {
                    log::debug!(
                        "accepted piece {:?} at {} depth {}",
                        std::mem::discriminant(&candidate.kind),
                        candidate.bounds.min,
                        candidate.depth
                    );
                    self.push(candidate);
                }
            }
        }
    }

    /// Acceptance gates applied to every candidate, in a fixed order:
    /// depth, horizontal range from the anchor, floor height, collision.
    fn accepts(&self, candidate: &Piece, anchor: BlockPos, config: &AssemblyConfig) -> bool {
        if candidate.depth > config.max_depth {
            return false;
        }
        let center = candidate.bounds.center();
        if (center.x - anchor.x).abs() > config.horizontal_range
            || (center.z - anchor.z).abs() > config.horizontal_range
        {
            return false;
        }
        if candidate.bounds.min.y <= config.min_floor_y {
            return false;
        }
        !self.collides(&candidate.bounds)
    }

    pub fn to_json(&self) -> Result<String, AssemblyError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, AssemblyError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Build a graph with bounded whole-graph retry. Each attempt runs
/// `build` with a fresh RNG seeded at `seed + attempt`; the first graph
/// passing `is_complete` wins. Exhausting the budget is a typed error,
/// never an infinite loop.
pub fn build_with_retry(
    config: &AssemblyConfig,
    seed: u64,
    mut build: impl FnMut(&mut WorldgenRng) -> PieceGraph,
    mut is_complete: impl FnMut(&PieceGraph) -> bool,
) -> Result<PieceGraph, AssemblyError> {
    for attempt in 0..config.max_attempts {
        let mut rng = WorldgenRng::new(seed.wrapping_add(attempt as u64));
        let graph = build(&mut rng);
        if is_complete(&graph) {
            if attempt > 0 {
                log::debug!("assembly succeeded on retry {attempt}");
            }
            return Ok(graph);
        }
    }
    Err(AssemblyError::MandatoryPieceMissing {
        attempts: config.max_attempts,
    })
}
