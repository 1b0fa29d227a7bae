use lazy_static::lazy_static;
use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;
pub use string_cache::DefaultAtom as Atom;

/// Stable handle for an interned prompt. Ids are never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PromptId(usize);

impl PromptId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for PromptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Default)]
struct Prompts {
    atoms: Vec<Atom>,
    ids: HashMap<Atom, PromptId>,
}

lazy_static! {
    static ref PROMPTS: RwLock<Prompts> = RwLock::new(Prompts::default());
}

/// Interns `text`; the same text always maps to the same id.
pub fn intern_prompt(text: &str) -> PromptId {
    let atom = Atom::from(text);
    if let Some(&id) = PROMPTS
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .ids
        .get(&atom)
    {
        return id;
    }
    let mut prompts = PROMPTS.write().unwrap_or_else(|e| e.into_inner());
    if let Some(&id) = prompts.ids.get(&atom) {
        return id;
    }
    let id = PromptId(prompts.atoms.len());
    prompts.atoms.push(atom.clone());
    prompts.ids.insert(atom, id);
    id
}

pub fn prompt(id: PromptId) -> Option<Atom> {
    PROMPTS
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .atoms
        .get(id.0)
        .cloned()
}

pub fn prompt_count() -> usize {
    PROMPTS.read().unwrap_or_else(|e| e.into_inner()).atoms.len()
}
