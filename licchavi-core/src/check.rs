/// On-demand invariant checks over the population and the history.
use crate::error::ConsistencyError;
use crate::history::History;
use crate::population::NodePopulation;
use crate::types::ItemDictionary;

/// Outcome of one consistency check. `None` means the part is consistent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsistencyReport {
    pub population: Option<String>,
    pub history: Option<String>,
}

impl ConsistencyReport {
    pub fn is_ok(&self) -> bool {
        self.population.is_none() && self.history.is_none()
    }

    pub fn into_result(self) -> Result<(), ConsistencyError> {
        if let Some(msg) = self.population {
            return Err(ConsistencyError::Population(msg));
        }
        if let Some(msg) = self.history {
            return Err(ConsistencyError::History(msg));
        }
        Ok(())
    }
}

pub fn check(
    population: &NodePopulation,
    history: &History,
    dictionary: &ItemDictionary,
) -> ConsistencyReport {
    ConsistencyReport {
        population: check_population(population, dictionary),
        history: check_history(history, population.max_age()),
    }
}

fn check_population(population: &NodePopulation, dictionary: &ItemDictionary) -> Option<String> {
    let nb_items = dictionary.len();
    if population.nb_items() != nb_items {
        return Some(format!(
            "population built for {} items, dictionary has {}",
            population.nb_items(),
            nb_items
        ));
    }
    for (slot, node) in population.nodes().iter().enumerate() {
        if node.model().len() != nb_items {
            return Some(format!("node {slot} model has {} parameters", node.model().len()));
        }
        if node.optimizer().dim() != nb_items {
            return Some(format!("node {slot} optimizer tracks {} parameters", node.optimizer().dim()));
        }
        if let Err(e) = node.data().validate(dictionary) {
            return Some(format!("node {slot} data: {e}"));
        }
    }
    None
}

fn check_history(history: &History, max_age: u32) -> Option<String> {
    let lengths = history.lengths();
    if lengths.iter().any(|&l| l != lengths[0]) {
        return Some(format!("sequence lengths differ: {lengths:?}"));
    }
    if lengths[0] < max_age as usize {
        return Some(format!("{} epochs recorded but a node is {} epochs old", lengths[0], max_age));
    }
    None
}
