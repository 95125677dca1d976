//! Custom interceptor configuration.
//!
//! Every interceptor is placed in the invocation chain by exactly one of
//! `position`, `index`, `after` or `before`.

use crate::attributes::{
    AttributeDefinition, AttributeSet, AttributeValue, ChangeTracker, CombinePolicy,
};
use crate::builder::{Builder, ConfigurationElement, ErrorCollector};
use crate::config::{read_repeated, Identified};
use crate::error::{Result, Violation};
use std::collections::{BTreeMap, BTreeSet};

/// Fixed placements in the interceptor chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterceptorPosition {
    /// Runs before every other interceptor.
    First,
    /// Runs after every other interceptor.
    Last,
}

impl AttributeValue for InterceptorPosition {}

/// `interceptor.name`
pub static NAME: AttributeDefinition<String> =
    AttributeDefinition::new("name", String::new()).immutable();
/// `interceptor.position`
pub static POSITION: AttributeDefinition<Option<InterceptorPosition>> =
    AttributeDefinition::new("position", None).immutable();
/// `interceptor.index`
pub static INDEX: AttributeDefinition<Option<u32>> =
    AttributeDefinition::new("index", None).immutable();
/// `interceptor.after`
pub static AFTER: AttributeDefinition<Option<String>> =
    AttributeDefinition::new("after", None).immutable();
/// `interceptor.before`
pub static BEFORE: AttributeDefinition<Option<String>> =
    AttributeDefinition::new("before", None).immutable();
/// `interceptor.properties`
pub static PROPERTIES: AttributeDefinition<BTreeMap<String, String>> =
    AttributeDefinition::new("properties", BTreeMap::new()).immutable();

/// Builder for one [`InterceptorConfiguration`].
#[derive(Debug)]
pub struct InterceptorConfigurationBuilder {
    attributes: AttributeSet,
}

impl InterceptorConfigurationBuilder {
    fn new(tracker: &ChangeTracker, name: &str) -> Self {
        let mut attributes = InterceptorConfiguration::attribute_set();
        tracker.attach(&mut attributes);
        attributes.write(&NAME, name.to_string());
        Self { attributes }
    }

    /// Interceptor name.
    pub fn name(&self) -> &str {
        self.attributes.get(&NAME).as_str()
    }

    /// Places the interceptor first or last in the chain.
    pub fn position(&mut self, position: InterceptorPosition) -> &mut Self {
        self.attributes.write(&POSITION, Some(position));
        self
    }

    /// Places the interceptor at a fixed chain index.
    pub fn index(&mut self, index: u32) -> &mut Self {
        self.attributes.write(&INDEX, Some(index));
        self
    }

    /// Places the interceptor right after `interceptor`.
    pub fn after(&mut self, interceptor: impl Into<String>) -> &mut Self {
        self.attributes.write(&AFTER, Some(interceptor.into()));
        self
    }

    /// Places the interceptor right before `interceptor`.
    pub fn before(&mut self, interceptor: impl Into<String>) -> &mut Self {
        self.attributes.write(&BEFORE, Some(interceptor.into()));
        self
    }

    /// Adds a property passed to the interceptor.
    pub fn add_property(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let mut properties = self.attributes.get(&PROPERTIES).clone();
        properties.insert(key.into(), value.into());
        self.attributes.write(&PROPERTIES, properties);
        self
    }

    fn placements(&self) -> usize {
        [
            self.attributes.attribute(&POSITION).is_null(),
            self.attributes.attribute(&INDEX).is_null(),
            self.attributes.attribute(&AFTER).is_null(),
            self.attributes.attribute(&BEFORE).is_null(),
        ]
        .into_iter()
        .filter(|null| !null)
        .count()
    }
}

impl Identified for InterceptorConfigurationBuilder {
    fn identity(&self) -> &str {
        self.name()
    }
}

impl Builder for InterceptorConfigurationBuilder {
    type Target = InterceptorConfiguration;

    fn validate(&self) -> Result<()> {
        let mut errors = ErrorCollector::new();
        let element = format!("custom-interceptors.interceptor[{}]", self.name());
        let name = self.name().to_string();
        errors.ensure(!name.is_empty(), &element, Violation::Missing { attribute: "name" });
        match self.placements() {
            0 => errors.ensure(false, &element, Violation::InterceptorPositionRequired { name }),
            1 => {}
            _ => errors.ensure(false, &element, Violation::InterceptorPositionAmbiguous { name }),
        }
        errors.into_result()
    }

    fn create(self) -> InterceptorConfiguration {
        InterceptorConfiguration::new(self.attributes.protect())
    }

    fn read(&mut self, template: &InterceptorConfiguration, policy: CombinePolicy) -> Result<()> {
        self.attributes.read(&template.attributes, policy)
    }
}

/// One frozen interceptor declaration.
#[derive(Debug, PartialEq)]
pub struct InterceptorConfiguration {
    attributes: AttributeSet,
}

impl InterceptorConfiguration {
    pub(crate) fn attribute_set() -> AttributeSet {
        AttributeSet::new(
            "custom-interceptors.interceptor",
            &[&NAME, &POSITION, &INDEX, &AFTER, &BEFORE, &PROPERTIES],
        )
    }

    fn new(attributes: AttributeSet) -> Self {
        debug_assert!(attributes.check_protection().is_ok());
        Self { attributes }
    }

    /// Interceptor name.
    pub fn name(&self) -> &str {
        self.attributes.get(&NAME).as_str()
    }

    /// Fixed position, if any.
    pub fn position(&self) -> Option<InterceptorPosition> {
        *self.attributes.get(&POSITION)
    }

    /// Fixed chain index, if any.
    pub fn index(&self) -> Option<u32> {
        *self.attributes.get(&INDEX)
    }

    /// Interceptor this one follows, if any.
    pub fn after(&self) -> Option<&str> {
        self.attributes.get(&AFTER).as_deref()
    }

    /// Interceptor this one precedes, if any.
    pub fn before(&self) -> Option<&str> {
        self.attributes.get(&BEFORE).as_deref()
    }

    /// Properties passed to the interceptor.
    pub fn properties(&self) -> &BTreeMap<String, String> {
        self.attributes.get(&PROPERTIES)
    }
}

impl Identified for InterceptorConfiguration {
    fn identity(&self) -> &str {
        self.name()
    }
}

impl ConfigurationElement for InterceptorConfiguration {
    fn element_name(&self) -> String {
        format!("interceptor[{}]", self.name())
    }

    fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }
}

/// Builder for [`CustomInterceptorsConfiguration`].
#[derive(Debug)]
pub struct CustomInterceptorsConfigurationBuilder {
    attributes: AttributeSet,
    interceptors: Vec<InterceptorConfigurationBuilder>,
    tracker: ChangeTracker,
}

impl CustomInterceptorsConfigurationBuilder {
    pub(crate) fn new(tracker: &ChangeTracker) -> Self {
        Self {
            attributes: CustomInterceptorsConfiguration::attribute_set(),
            interceptors: Vec::new(),
            tracker: tracker.clone(),
        }
    }

    /// Declares an interceptor named `name`.
    pub fn add_interceptor(&mut self, name: &str) -> &mut InterceptorConfigurationBuilder {
        self.interceptors
            .push(InterceptorConfigurationBuilder::new(&self.tracker, name));
        let last = self.interceptors.len() - 1;
        &mut self.interceptors[last]
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }
}

impl Builder for CustomInterceptorsConfigurationBuilder {
    type Target = CustomInterceptorsConfiguration;

    fn validate(&self) -> Result<()> {
        let mut errors = ErrorCollector::new();
        let mut names = BTreeSet::new();
        for interceptor in &self.interceptors {
            errors.check(interceptor.validate());
            if !names.insert(interceptor.name()) {
                errors.ensure(
                    false,
                    "custom-interceptors",
                    Violation::DuplicateElement {
                        name: interceptor.name().to_string(),
                    },
                );
            }
        }
        errors.into_result()
    }

    fn create(self) -> CustomInterceptorsConfiguration {
        CustomInterceptorsConfiguration::new(
            self.attributes.protect(),
            self.interceptors.into_iter().map(Builder::create).collect(),
        )
    }

    fn read(
        &mut self,
        template: &CustomInterceptorsConfiguration,
        policy: CombinePolicy,
    ) -> Result<()> {
        let tracker = self.tracker.clone();
        read_repeated(&mut self.interceptors, &template.interceptors, policy, |name| {
            InterceptorConfigurationBuilder::new(&tracker, name)
        })
    }
}

/// Frozen interceptor declarations.
#[derive(Debug, PartialEq)]
pub struct CustomInterceptorsConfiguration {
    attributes: AttributeSet,
    interceptors: Vec<InterceptorConfiguration>,
}

impl CustomInterceptorsConfiguration {
    pub(crate) fn attribute_set() -> AttributeSet {
        AttributeSet::new("custom-interceptors", &[])
    }

    fn new(attributes: AttributeSet, interceptors: Vec<InterceptorConfiguration>) -> Self {
        debug_assert!(attributes.check_protection().is_ok());
        Self {
            attributes,
            interceptors,
        }
    }

    /// Declared interceptors, in order.
    pub fn interceptors(&self) -> &[InterceptorConfiguration] {
        &self.interceptors
    }
}

impl ConfigurationElement for CustomInterceptorsConfiguration {
    fn element_name(&self) -> String {
        "custom-interceptors".to_string()
    }

    fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }

    fn children(&self) -> Vec<&dyn ConfigurationElement> {
        self.interceptors
            .iter()
            .map(|i| i as &dyn ConfigurationElement)
            .collect()
    }
}
