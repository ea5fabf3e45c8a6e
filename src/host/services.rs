//! Minimal service registration used by the host builders.

use crate::error::{ConfigError, Result};
use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::Arc;

type Instance = Arc<dyn Any + Send + Sync>;

struct ServiceEntry {
    type_name: &'static str,
    instance: Instance,
}

/// Singleton registrations, keyed by type.
///
/// Registering a type twice replaces the earlier instance but keeps its
/// original position.
///
/// # Examples
///
/// ```rust
/// use layered_config::host::ServiceCollection;
///
/// #[derive(Debug, PartialEq)]
/// struct Greeting(&'static str);
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(Greeting("hello"));
///
/// let provider = services.build_service_provider();
/// assert_eq!(*provider.get::<Greeting>().unwrap(), Greeting("hello"));
/// ```
#[derive(Default)]
pub struct ServiceCollection {
    order: Vec<TypeId>,
    services: HashMap<TypeId, ServiceEntry>,
}

impl ServiceCollection {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `service` as the singleton for `T`.
    pub fn add_singleton<T>(&mut self, service: T) -> &mut Self
    where
        T: Any + Send + Sync,
    {
        self.add_shared(Arc::new(service))
    }

    /// Register an already shared singleton for `T`.
    pub fn add_shared<T>(&mut self, service: Arc<T>) -> &mut Self
    where
        T: Any + Send + Sync,
    {
        let type_id = TypeId::of::<T>();
        let entry = ServiceEntry {
            type_name: type_name::<T>(),
            instance: service,
        };
        if self.services.insert(type_id, entry).is_none() {
            self.order.push(type_id);
        }
        self
    }

    /// Whether a singleton for `T` is registered.
    pub fn contains<T: Any>(&self) -> bool {
        self.services.contains_key(&TypeId::of::<T>())
    }

    /// Number of registrations.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Type names of the registrations, in registration order.
    pub fn type_names(&self) -> Vec<&'static str> {
        self.order
            .iter()
            .filter_map(|id| self.services.get(id))
            .map(|entry| entry.type_name)
            .collect()
    }

    /// Freeze the registrations into a provider.
    pub fn build_service_provider(&self) -> ServiceProvider {
        ServiceProvider {
            services: Arc::new(
                self.services
                    .iter()
                    .map(|(id, entry)| (*id, Arc::clone(&entry.instance)))
                    .collect(),
            ),
        }
    }
}

impl std::fmt::Debug for ServiceCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceCollection")
            .field("services", &self.type_names())
            .finish()
    }
}

/// Read-only view over built singletons. Cheap to clone.
#[derive(Clone, Default)]
pub struct ServiceProvider {
    services: Arc<HashMap<TypeId, Instance>>,
}

impl ServiceProvider {
    /// The singleton registered for `T`, if any.
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let instance = self.services.get(&TypeId::of::<T>())?;
        Arc::clone(instance).downcast::<T>().ok()
    }

    /// The singleton registered for `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ServiceNotFound`] if `T` was never registered.
    pub fn get_required<T: Any + Send + Sync>(&self) -> Result<Arc<T>> {
        self.get::<T>()
            .ok_or(ConfigError::ServiceNotFound(type_name::<T>()))
    }

    /// Number of registered singletons.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl std::fmt::Debug for ServiceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceProvider")
            .field("services", &self.services.len())
            .finish()
    }
}

/// Turns a [`ServiceCollection`] into a container, lets callbacks configure
/// it, then produces the [`ServiceProvider`].
pub trait ServiceProviderFactory: Send + 'static {
    /// The container type callbacks registered with `configure_container` receive.
    type Container: Any + Send;

    /// Create the container from the registered services.
    fn create_builder(&self, services: ServiceCollection) -> Self::Container;

    /// Build the provider from the configured container.
    ///
    /// # Errors
    ///
    /// Implementations may reject an invalid container.
    fn create_service_provider(&self, container: Self::Container) -> Result<ServiceProvider>;
}

/// Factory whose container is the [`ServiceCollection`] itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultServiceProviderFactory;

impl ServiceProviderFactory for DefaultServiceProviderFactory {
    type Container = ServiceCollection;

    fn create_builder(&self, services: ServiceCollection) -> ServiceCollection {
        services
    }

    fn create_service_provider(&self, container: ServiceCollection) -> Result<ServiceProvider> {
        Ok(container.build_service_provider())
    }
}

/// Object-safe form of [`ServiceProviderFactory`] used by the host builder.
pub(crate) trait ErasedFactory: Send {
    fn create_builder(&self, services: ServiceCollection) -> Box<dyn Any + Send>;
    fn create_service_provider(&self, container: Box<dyn Any + Send>) -> Result<ServiceProvider>;
    fn container_type(&self) -> &'static str;
}

pub(crate) struct Erased<F>(pub(crate) F);

impl<F: ServiceProviderFactory> ErasedFactory for Erased<F> {
    fn create_builder(&self, services: ServiceCollection) -> Box<dyn Any + Send> {
        Box::new(self.0.create_builder(services))
    }

    fn create_service_provider(&self, container: Box<dyn Any + Send>) -> Result<ServiceProvider> {
        let container = container
            .downcast::<F::Container>()
            .map_err(|_| ConfigError::ContainerTypeMismatch {
                expected: type_name::<F::Container>(),
                actual: "an unknown container",
            })?;
        self.0.create_service_provider(*container)
    }

    fn container_type(&self) -> &'static str {
        type_name::<F::Container>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Port(u16);

    #[test]
    fn test_register_and_resolve() {
        let mut services = ServiceCollection::new();
        services.add_singleton(Port(8080)).add_singleton(String::from("name"));

        assert!(services.contains::<Port>());
        assert_eq!(services.len(), 2);

        let provider = services.build_service_provider();
        assert_eq!(*provider.get::<Port>().unwrap(), Port(8080));
        assert_eq!(provider.get::<String>().unwrap().as_str(), "name");
        assert!(provider.get::<u32>().is_none());
    }

    #[test]
    fn test_reregistration_replaces_in_place() {
        let mut services = ServiceCollection::new();
        services.add_singleton(Port(1)).add_singleton(1u8).add_singleton(Port(2));

        assert_eq!(services.len(), 2);
        assert!(services.type_names()[0].ends_with("Port"));
        assert_eq!(*services.build_service_provider().get::<Port>().unwrap(), Port(2));
    }

    #[test]
    fn test_get_required_missing() {
        let provider = ServiceCollection::new().build_service_provider();
        assert!(matches!(
            provider.get_required::<Port>(),
            Err(ConfigError::ServiceNotFound(_))
        ));
    }

    #[test]
    fn test_erased_default_factory() {
        let factory = Erased(DefaultServiceProviderFactory);
        let mut services = ServiceCollection::new();
        services.add_singleton(Port(1));

        let container = factory.create_builder(services);
        let provider = factory.create_service_provider(container).unwrap();
        assert_eq!(provider.len(), 1);
        assert!(factory.container_type().ends_with("ServiceCollection"));

        let wrong: Box<dyn Any + Send> = Box::new(5u32);
        assert!(matches!(
            factory.create_service_provider(wrong),
            Err(ConfigError::ContainerTypeMismatch { .. })
        ));
    }
}
