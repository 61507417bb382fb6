// Copyright (c) 2025 - Cowboy AI, Inc.
//! Provisioning Plan Graph
//!
//! Explicit dependency graph of declared resources. Nodes are resource
//! declarations, edges point from a resource to the resources it depends
//! on. Dependencies must already be declared, so declaration order is a
//! valid creation order; [`ProvisioningPlan::validate`] checks the
//! remaining structural rules.

use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

use super::resources::{ResourceKind, ResourceRef, ResourceSpec};

/// Plan construction and validation errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("Resource already declared: {0}")]
    DuplicateResource(ResourceRef),

    #[error("Resource {resource} depends on undeclared resource {dependency}")]
    UnknownDependency {
        resource: ResourceRef,
        dependency: ResourceRef,
    },

    #[error("Compute resource {0} has no dependencies")]
    MissingDependencies(ResourceRef),

    #[error("Compute resource {resource} depends on compute resource {dependency}")]
    ComputeDependsOnCompute {
        resource: ResourceRef,
        dependency: ResourceRef,
    },

    #[error("Resource {resource} references {reference} without depending on it")]
    ImplicitReference {
        resource: ResourceRef,
        reference: ResourceRef,
    },

    #[error("Dependency cycle involving: {}", .0.iter().map(|r| r.as_str()).collect::<Vec<_>>().join(", "))]
    Cycle(Vec<ResourceRef>),
}

/// One declared resource with its explicit dependencies
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeclaredResource {
    pub name: ResourceRef,
    pub spec: ResourceSpec,
    pub depends_on: Vec<ResourceRef>,
}

impl DeclaredResource {
    pub fn kind(&self) -> ResourceKind {
        self.spec.kind()
    }
}

/// Directed acyclic graph of resource declarations
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProvisioningPlan {
    resources: Vec<DeclaredResource>,
    #[serde(skip)]
    index: HashMap<ResourceRef, usize>,
}

impl ProvisioningPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource to the plan
    ///
    /// Fails on a duplicate name or a dependency that has not been declared
    /// yet. Duplicate entries in `depends_on` are collapsed.
    pub fn declare(
        &mut self,
        name: impl Into<ResourceRef>,
        spec: ResourceSpec,
        depends_on: Vec<ResourceRef>,
    ) -> Result<ResourceRef, PlanError> {
        self.insert(DeclaredResource {
            name: name.into(),
            spec,
            depends_on,
        })
    }

    /// Validate a declaration without adding it
    pub fn check(
        &self,
        name: ResourceRef,
        spec: ResourceSpec,
        depends_on: Vec<ResourceRef>,
    ) -> Result<DeclaredResource, PlanError> {
        if self.index.contains_key(&name) {
            return Err(PlanError::DuplicateResource(name));
        }

        let mut deps: Vec<ResourceRef> = Vec::with_capacity(depends_on.len());
        for dependency in depends_on {
            if !self.index.contains_key(&dependency) {
                return Err(PlanError::UnknownDependency {
                    resource: name,
                    dependency,
                });
            }
            if !deps.contains(&dependency) {
                deps.push(dependency);
            }
        }

        Ok(DeclaredResource {
            name,
            spec,
            depends_on: deps,
        })
    }

    /// Add a declaration, usually one produced by [`check`](Self::check)
    ///
    /// The declaration is checked again against the current plan, so one
    /// that was checked before a same-named resource got in is rejected.
    pub fn insert(&mut self, resource: DeclaredResource) -> Result<ResourceRef, PlanError> {
        let resource = self.check(resource.name, resource.spec, resource.depends_on)?;
        let name = resource.name.clone();
        self.index.insert(name.clone(), self.resources.len());
        self.resources.push(resource);
        Ok(name)
    }

    pub fn get(&self, name: &ResourceRef) -> Option<&DeclaredResource> {
        self.index.get(name).map(|&i| &self.resources[i])
    }

    pub fn contains(&self, name: &ResourceRef) -> bool {
        self.index.contains_key(name)
    }

    /// All declarations in declaration order
    pub fn resources(&self) -> &[DeclaredResource] {
        &self.resources
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Explicit dependencies of `name`, or `None` if undeclared
    pub fn dependencies_of(&self, name: &ResourceRef) -> Option<&[ResourceRef]> {
        self.get(name).map(|r| r.depends_on.as_slice())
    }

    pub fn count_of(&self, kind: ResourceKind) -> usize {
        self.resources.iter().filter(|r| r.kind() == kind).count()
    }

    pub fn of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &DeclaredResource> {
        self.resources.iter().filter(move |r| r.kind() == kind)
    }

    /// Check the structural rules of the plan
    ///
    /// - every compute resource has at least one dependency
    /// - no compute resource depends on another compute resource
    /// - every resource referenced inside a spec is an explicit dependency
    /// - every dependency is declared and the graph is acyclic
    pub fn validate(&self) -> Result<(), PlanError> {
        for resource in &self.resources {
            for dependency in &resource.depends_on {
                let target = self.get(dependency).ok_or_else(|| PlanError::UnknownDependency {
                    resource: resource.name.clone(),
                    dependency: dependency.clone(),
                })?;
                if resource.spec.is_compute() && target.spec.is_compute() {
                    return Err(PlanError::ComputeDependsOnCompute {
                        resource: resource.name.clone(),
                        dependency: dependency.clone(),
                    });
                }
            }

            if resource.spec.is_compute() && resource.depends_on.is_empty() {
                return Err(PlanError::MissingDependencies(resource.name.clone()));
            }

            for reference in resource.spec.references() {
                if !resource.depends_on.contains(reference) {
                    return Err(PlanError::ImplicitReference {
                        resource: resource.name.clone(),
                        reference: reference.clone(),
                    });
                }
            }
        }

        self.topological_order().map(|_| ())
    }

    /// Creation order: every resource after all of its dependencies
    ///
    /// Kahn's algorithm; among ready resources declaration order is kept.
    pub fn topological_order(&self) -> Result<Vec<&DeclaredResource>, PlanError> {
        let mut remaining: Vec<usize> = self
            .resources
            .iter()
            .map(|r| r.depends_on.len())
            .collect();
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.resources.len()];
        for (i, resource) in self.resources.iter().enumerate() {
            for dependency in &resource.depends_on {
                if let Some(&d) = self.index.get(dependency) {
                    dependents[d].push(i);
                }
            }
        }

        let mut ready: BTreeSet<usize> = remaining
            .iter()
            .enumerate()
            .filter(|(_, &n)| n == 0)
            .map(|(i, _)| i)
            .collect();
        let mut order = Vec::with_capacity(self.resources.len());

        while let Some(i) = ready.pop_first() {
            order.push(&self.resources[i]);
            for &dependent in &dependents[i] {
                remaining[dependent] -= 1;
                if remaining[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }

        if order.len() != self.resources.len() {
            let stuck = remaining
                .iter()
                .enumerate()
                .filter(|(_, &n)| n > 0)
                .map(|(i, _)| self.resources[i].name.clone())
                .collect();
            return Err(PlanError::Cycle(stuck));
        }

        Ok(order)
    }
}
