//! Social scope resolution.
//!
//! Given a requester and a scope mode, produce the set of author IDs whose
//! plans are visible. The friendship table stores directed edges; the two
//! traversals treat direction differently:
//!
//! - `friends`: symmetric one-hop. An edge A -> B qualifies B for A and A
//!   for B.
//! - `friends_of_friends`: asymmetric two-hop. Both hops follow stored
//!   edge direction only, and the requester's own ID is not excluded from
//!   the result. This mirrors the observable behavior of the original
//!   nested-subquery traversal and must not be "fixed" without revising
//!   the contract.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

// ---------------------------------------------------------------------------
// Scope mode
// ---------------------------------------------------------------------------

/// Social-graph restriction applied to a plan listing request.
///
/// Absence of the `filter_by_people` parameter means no restriction, so
/// there is no `None` variant here; callers model that with `Option`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeMode {
    Friends,
    FriendsOfFriends,
}

impl fmt::Display for ScopeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Friends => "friends",
            Self::FriendsOfFriends => "friends_of_friends",
        };
        f.write_str(s)
    }
}

impl FromStr for ScopeMode {
    type Err = ScopeModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "friends" => Ok(Self::Friends),
            "friends_of_friends" => Ok(Self::FriendsOfFriends),
            other => Err(ScopeModeParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`ScopeMode`] string.
#[derive(Debug, Clone)]
pub struct ScopeModeParseError(pub String);

impl fmt::Display for ScopeModeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid people filter: {:?}", self.0)
    }
}

impl std::error::Error for ScopeModeParseError {}

// ---------------------------------------------------------------------------
// Friend graph
// ---------------------------------------------------------------------------

/// In-memory adjacency view of the friendship relation.
///
/// Keeps forward and reverse edge maps so that the symmetric one-hop query
/// and the direction-preserving two-hop query share one structure instead
/// of two near-duplicate SQL strings.
#[derive(Debug, Default)]
pub struct FriendGraph {
    forward: HashMap<Uuid, HashSet<Uuid>>,
    reverse: HashMap<Uuid, HashSet<Uuid>>,
}

impl FriendGraph {
    /// Build a graph from directed (user_id, friend_id) edges.
    pub fn from_edges(edges: impl IntoIterator<Item = (Uuid, Uuid)>) -> Self {
        let mut graph = Self::default();
        for (user_id, friend_id) in edges {
            graph.forward.entry(user_id).or_default().insert(friend_id);
            graph.reverse.entry(friend_id).or_default().insert(user_id);
        }
        graph
    }

    /// Symmetric one-hop: every ID sharing an edge with `user` in either
    /// direction.
    pub fn friends_of(&self, user: Uuid) -> HashSet<Uuid> {
        let mut out = HashSet::new();
        if let Some(ids) = self.forward.get(&user) {
            out.extend(ids.iter().copied());
        }
        if let Some(ids) = self.reverse.get(&user) {
            out.extend(ids.iter().copied());
        }
        out
    }

    /// Asymmetric two-hop: the forward one-hop friends of each of `user`'s
    /// forward one-hop friends. Neither hop is symmetrized, and `user` is
    /// kept in the result when reachable.
    pub fn friends_of_friends(&self, user: Uuid) -> HashSet<Uuid> {
        let mut out = HashSet::new();
        if let Some(direct) = self.forward.get(&user) {
            for friend in direct {
                if let Some(ids) = self.forward.get(friend) {
                    out.extend(ids.iter().copied());
                }
            }
        }
        out
    }

    /// The eligible author set for a scope mode.
    pub fn eligible_authors(&self, mode: ScopeMode, requester: Uuid) -> HashSet<Uuid> {
        match mode {
            ScopeMode::Friends => self.friends_of(requester),
            ScopeMode::FriendsOfFriends => self.friends_of_friends(requester),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
