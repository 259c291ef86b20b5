//! Viewpoint merging.
//!
//! Power, science and navigation contracts of the same step (or the same
//! timeline) describe independent aspects of it; merging conjoins them.

use crate::algebra::{Contract, ContractAlgebra};
use crate::error::ContractError;
use crate::factory::ContractFactory;

impl<'a, A: ContractAlgebra> ContractFactory<'a, A> {
    /// Conjoins two contracts, counting one merge.
    pub fn merge(&mut self, a: &Contract, b: &Contract) -> Result<Contract, ContractError> {
        let merged = self.algebra().merge(a, b)?;
        self.counts_mut().merges += 1;
        Ok(merged)
    }

    /// Left fold of [`merge`](Self::merge). The empty list yields
    /// [`Contract::top`].
    pub fn merge_all<'c, I>(&mut self, contracts: I) -> Result<Contract, ContractError>
    where
        I: IntoIterator<Item = &'c Contract>,
    {
        let mut iter = contracts.into_iter();
        let Some(first) = iter.next() else {
            return Ok(Contract::top());
        };
        let mut acc = first.clone();
        for c in iter {
            acc = self.merge(&acc, c)?;
        }
        Ok(acc)
    }
}

#[cfg(test)]
mod tests {
    use crate::algebra::{Contract, ContractAlgebra, Polyhedra};
    use crate::factory::{ContractFactory, RateRange, StateVar, Task};

    fn range(low: f64, high: f64) -> RateRange {
        RateRange::new(low, high).unwrap()
    }

    #[test]
    fn test_merge_disjoint_always_succeeds() {
        let algebra = Polyhedra::new();
        let mut factory = ContractFactory::new(&algebra);
        let p = factory.power_consumer(1, Task::Dsn, range(2.0, 2.2)).unwrap();
        let s = factory.downlink(1, range(5.0, 6.0)).unwrap();
        let merged = factory.merge(&p, &s).unwrap();
        assert!(merged.has_output("soc1_exit") && merged.has_output("d1_exit"));
        assert_eq!(factory.counts().merges, 1);
    }

    #[test]
    fn test_merge_commutative_and_associative() {
        let algebra = Polyhedra::new();
        let mut factory = ContractFactory::new(&algebra);
        let a = factory.science_storage(3, range(2.0, 8.0)).unwrap();
        let b = factory.science_cumulative(3, range(2.0, 8.0)).unwrap();
        let c = factory.uncertainty_improvement(3, range(0.5, 0.8)).unwrap();

        let ab = factory.merge(&a, &b).unwrap();
        let ba = factory.merge(&b, &a).unwrap();
        assert!(algebra.equivalent(&ab, &ba).unwrap());

        let ab_c = factory.merge(&ab, &c).unwrap();
        let bc = factory.merge(&b, &c).unwrap();
        let a_bc = factory.merge(&a, &bc).unwrap();
        assert!(algebra.equivalent(&ab_c, &a_bc).unwrap());
    }

    #[test]
    fn test_merge_all() {
        let algebra = Polyhedra::new();
        let mut factory = ContractFactory::new(&algebra);
        let parts = vec![
            factory.no_change(2, StateVar::Data).unwrap(),
            factory.no_change(2, StateVar::Cumulative).unwrap(),
            factory.no_change(2, StateVar::Uncertainty).unwrap(),
        ];
        let merged = factory.merge_all(&parts).unwrap();
        assert_eq!(merged.outputs().len(), 3);
        assert_eq!(factory.counts().merges, 2);

        let empty: Vec<Contract> = Vec::new();
        assert_eq!(factory.merge_all(&empty).unwrap(), Contract::top());
    }

    #[test]
    fn test_merge_conflict() {
        let algebra = Polyhedra::new();
        let mut factory = ContractFactory::new(&algebra);
        let base = factory.no_change(1, StateVar::Soc).unwrap();
        let soc = vec!["soc1_entry".to_string()];
        let low = algebra
            .construct_from_strings(soc.clone(), vec![], &["soc1_entry <= 10"], &[])
            .unwrap();
        let high = algebra
            .construct_from_strings(soc, vec![], &["soc1_entry >= 20"], &[])
            .unwrap();
        let partial = factory.merge(&base, &low).unwrap();
        let err = factory.merge(&partial, &high).unwrap_err();
        assert!(err.is_unsatisfiable_merge());
        assert_eq!(factory.counts().merges, 1);
    }
}
