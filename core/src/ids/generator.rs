use super::{ConstraintId, HandleId, VariableId};
use uuid::Uuid;

/// A deterministic ID generator that produces a sequence of ids
/// based on a seed namespace and a counter.
///
/// Two systems built from the same seed with the same sequence of calls
/// hand out identical ids, which keeps solver runs reproducible.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    namespace: Uuid,
    counter: u64,
}

impl IdGenerator {
    /// Create a new generator from a string seed.
    pub fn new(seed: &str) -> Self {
        let namespace = Uuid::new_v5(&Uuid::NAMESPACE_OID, seed.as_bytes());
        Self { namespace, counter: 0 }
    }

    fn next_uuid(&mut self) -> Uuid {
        let count = self.counter;
        self.counter += 1;
        Uuid::new_v5(&self.namespace, &count.to_be_bytes())
    }

    pub fn next_variable(&mut self) -> VariableId {
        VariableId::from_uuid(self.next_uuid())
    }

    pub fn next_handle(&mut self) -> HandleId {
        HandleId::from_uuid(self.next_uuid())
    }

    pub fn next_constraint(&mut self) -> ConstraintId {
        ConstraintId::from_uuid(self.next_uuid())
    }

    /// Number of ids issued so far.
    pub fn issued(&self) -> u64 {
        self.counter
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new("relax")
    }
}
