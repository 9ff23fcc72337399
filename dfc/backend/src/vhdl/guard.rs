//! Path predicates over branch conditions, kept as a simplified sum of
//! products.
use dfc_ir::NodeIdx;
use itertools::Itertools;

/// A branch condition and the value it has on the path.
pub(super) type Literal = (NodeIdx, bool);

/// Disjunction of conjunctions of [Literal]s. Every term is sorted and
/// free of contradictions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Guard(Vec<Vec<Literal>>);

impl Guard {
    pub fn always() -> Self {
        Guard(vec![vec![]])
    }

    pub fn never() -> Self {
        Guard(vec![])
    }

    pub fn is_always(&self) -> bool {
        self.0.iter().any(|term| term.is_empty())
    }

    pub fn is_never(&self) -> bool {
        self.0.is_empty()
    }

    /// This guard restricted to paths where `lit` holds.
    pub fn and(&self, lit: Literal) -> Self {
        let terms = self
            .0
            .iter()
            .filter(|term| !term.contains(&(lit.0, !lit.1)))
            .map(|term| {
                let mut term = term.clone();
                if !term.contains(&lit) {
                    term.push(lit);
                    term.sort();
                }
                term
            })
            .collect();
        Guard(terms).simplified()
    }

    pub fn or(mut self, other: Guard) -> Self {
        self.0.extend(other.0);
        self.simplified()
    }

    /// Branch conditions the guard reads.
    pub fn conditions(&self) -> impl Iterator<Item = NodeIdx> + '_ {
        self.0.iter().flatten().map(|(node, _)| *node).unique()
    }

    /// VHDL condition, naming every branch condition through `name`.
    pub fn render(&self, name: impl Fn(NodeIdx) -> String) -> String {
        if self.is_always() {
            return "true".to_string();
        }
        if self.is_never() {
            return "false".to_string();
        }
        let parens = self.0.len() > 1;
        self.0
            .iter()
            .map(|term| {
                let conj = term
                    .iter()
                    .map(|(node, taken)| {
                        let bit = if *taken { "\"1\"" } else { "\"0\"" };
                        format!("{} = {bit}", name(*node))
                    })
                    .join(" and ");
                if parens && term.len() > 1 {
                    format!("({conj})")
                } else {
                    conj
                }
            })
            .join(" or ")
    }

    /// Merge terms that differ in the value of one condition and drop terms
    /// implied by shorter ones, until nothing changes.
    fn simplified(mut self) -> Self {
        loop {
            self.0.sort();
            self.0.dedup();
            let terms = &self.0;
            let absorbed = (0..terms.len()).find(|&b| {
                (0..terms.len()).any(|a| {
                    a != b && terms[a].iter().all(|lit| terms[b].contains(lit))
                })
            });
            if let Some(b) = absorbed {
                self.0.remove(b);
                continue;
            }
            let merge = terms.iter().enumerate().find_map(|(a, ta)| {
                terms.iter().enumerate().skip(a + 1).find_map(|(b, tb)| {
                    Self::resolvent(ta, tb).map(|term| (a, b, term))
                })
            });
            match merge {
                Some((a, b, term)) => {
                    self.0.remove(b);
                    self.0[a] = term;
                }
                None => return self,
            }
        }
    }

    /// `t` when the terms are `t and c` and `t and not c`.
    fn resolvent(a: &[Literal], b: &[Literal]) -> Option<Vec<Literal>> {
        if a.len() != b.len() {
            return None;
        }
        let mut diff = a.iter().zip(b).filter(|(x, y)| x != y);
        match (diff.next(), diff.next()) {
            (Some((x, y)), None) if x.0 == y.0 => {
                Some(a.iter().filter(|lit| *lit != x).copied().collect())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(i: u32, taken: bool) -> Literal {
        (NodeIdx::from(i), taken)
    }

    fn show(g: &Guard) -> String {
        g.render(|n| format!("c{n}"))
    }

    #[test]
    fn both_sides_of_a_branch_rejoin() {
        let g = Guard::always();
        let joined = g.and(lit(0, true)).or(g.and(lit(0, false)));
        assert!(joined.is_always());
        assert_eq!(show(&joined), "true");
    }

    #[test]
    fn nested_branches_conjoin() {
        let inner = Guard::always().and(lit(0, true)).and(lit(1, false));
        assert_eq!(show(&inner), "c0 = \"1\" and c1 = \"0\"");
        let other = Guard::always().and(lit(0, false));
        assert_eq!(
            show(&inner.clone().or(other)),
            "c0 = \"0\" or (c0 = \"1\" and c1 = \"0\")"
        );
        assert_eq!(inner.conditions().count(), 2);
    }

    #[test]
    fn contradictions_and_implied_terms_vanish() {
        let g = Guard::always().and(lit(0, true));
        assert!(g.and(lit(0, false)).is_never());
        let wider = g.clone().or(g.and(lit(1, true)));
        assert_eq!(wider, g);
        assert_eq!(show(&Guard::never()), "false");
    }
}
