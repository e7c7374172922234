use std::{cell::RefCell, collections::HashMap};

use serde::{Deserialize, Serialize};

/// What a clearance lookup depends on for one of the two items involved.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Conditions {
    pub maybe_net: Option<usize>,
    pub maybe_layer: Option<usize>,
}

pub trait AccessRules {
    fn clearance(&self, conditions1: &Conditions, conditions2: &Conditions) -> i64;
    fn hole_clearance(&self, conditions1: &Conditions, conditions2: &Conditions) -> i64;
    fn largest_clearance(&self, maybe_net: Option<usize>) -> i64;
}

/// Clearance values as handed over by the design rule checker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearanceRules {
    pub clearance: i64,
    #[serde(default)]
    pub hole_clearance: i64,
    // net class name -> clearance
    #[serde(default)]
    pub class_clearances: HashMap<String, i64>,
    // layer -> clearance, overriding net classes on that layer
    #[serde(default)]
    pub layer_clearances: HashMap<usize, i64>,
    // net -> net class name
    #[serde(default)]
    pub net_classes: HashMap<usize, String>,
}

impl ClearanceRules {
    pub fn uniform(clearance: i64) -> Self {
        Self {
            clearance,
            hole_clearance: clearance,
            ..Default::default()
        }
    }

    fn net_clearance(&self, maybe_net: Option<usize>) -> i64 {
        maybe_net
            .and_then(|net| self.net_classes.get(&net))
            .and_then(|class| self.class_clearances.get(class))
            .copied()
            .unwrap_or(self.clearance)
    }
}

impl AccessRules for ClearanceRules {
    fn clearance(&self, conditions1: &Conditions, conditions2: &Conditions) -> i64 {
        let layer_override = conditions1
            .maybe_layer
            .or(conditions2.maybe_layer)
            .and_then(|layer| self.layer_clearances.get(&layer));

        if let Some(clearance) = layer_override {
            return *clearance;
        }

        self.net_clearance(conditions1.maybe_net)
            .max(self.net_clearance(conditions2.maybe_net))
    }

    fn hole_clearance(&self, _conditions1: &Conditions, _conditions2: &Conditions) -> i64 {
        self.hole_clearance
    }

    fn largest_clearance(&self, _maybe_net: Option<usize>) -> i64 {
        self.class_clearances
            .values()
            .chain(self.layer_clearances.values())
            .copied()
            .fold(self.clearance.max(self.hole_clearance), i64::max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RuleKey {
    Clearance(Option<usize>, Option<usize>, Option<usize>),
    HoleClearance(Option<usize>, Option<usize>, Option<usize>),
    Largest(Option<usize>),
}

impl RuleKey {
    fn ordered(a: Option<usize>, b: Option<usize>) -> (Option<usize>, Option<usize>) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }
}

/// Memoizing front of a rule source. Placement runs against this so that the rule source is
/// consulted at most once per distinct lookup; `prefetch` fills in the lookups a gesture is
/// going to need before its timed loop starts.
#[derive(Debug)]
pub struct RuleCache<R: AccessRules> {
    rules: R,
    memo: RefCell<HashMap<RuleKey, i64>>,
}

impl<R: AccessRules> RuleCache<R> {
    pub fn new(rules: R) -> Self {
        Self {
            rules,
            memo: RefCell::new(HashMap::new()),
        }
    }

    pub fn rules(&self) -> &R {
        &self.rules
    }

    /// Drops every memoized value, e.g. after the rule source was replaced.
    pub fn invalidate(&mut self) {
        self.memo.get_mut().clear();
    }

    /// Looks up every clearance between any two of `nets` on every layer, and the largest
    /// clearance of each of them.
    pub fn prefetch(&self, nets: &[Option<usize>], layer_count: usize) {
        for (i, net) in nets.iter().enumerate() {
            self.largest_clearance(*net);

            for other in &nets[i..] {
                for layer in 0..layer_count {
                    let conditions1 = Conditions {
                        maybe_net: *net,
                        maybe_layer: Some(layer),
                    };
                    let conditions2 = Conditions {
                        maybe_net: *other,
                        maybe_layer: Some(layer),
                    };
                    self.clearance(&conditions1, &conditions2);
                    self.hole_clearance(&conditions1, &conditions2);
                }
            }
        }
    }

    pub fn memoized_count(&self) -> usize {
        self.memo.borrow().len()
    }

    fn lookup(&self, key: RuleKey, compute: impl FnOnce(&R) -> i64) -> i64 {
        if let Some(value) = self.memo.borrow().get(&key) {
            return *value;
        }

        let value = compute(&self.rules);
        self.memo.borrow_mut().insert(key, value);
        value
    }
}

impl<R: AccessRules> AccessRules for RuleCache<R> {
    fn clearance(&self, conditions1: &Conditions, conditions2: &Conditions) -> i64 {
        let (net1, net2) = RuleKey::ordered(conditions1.maybe_net, conditions2.maybe_net);
        let layer = conditions1.maybe_layer.or(conditions2.maybe_layer);

        self.lookup(RuleKey::Clearance(net1, net2, layer), |rules| {
            rules.clearance(conditions1, conditions2)
        })
    }

    fn hole_clearance(&self, conditions1: &Conditions, conditions2: &Conditions) -> i64 {
        let (net1, net2) = RuleKey::ordered(conditions1.maybe_net, conditions2.maybe_net);
        let layer = conditions1.maybe_layer.or(conditions2.maybe_layer);

        self.lookup(RuleKey::HoleClearance(net1, net2, layer), |rules| {
            rules.hole_clearance(conditions1, conditions2)
        })
    }

    fn largest_clearance(&self, maybe_net: Option<usize>) -> i64 {
        self.lookup(RuleKey::Largest(maybe_net), |rules| {
            rules.largest_clearance(maybe_net)
        })
    }
}
