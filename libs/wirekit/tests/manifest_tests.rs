//! Manifest loading and resolution through the factory.

use std::io::Write;
use std::sync::Arc;

use wirekit::{
    async_trait, ComponentInstance, DependencyMap, Factory, FactoryError, Manifest, ManifestError,
    ManifestService, Platform, Renderable,
};

struct NamePlatform;

#[async_trait]
impl Platform for NamePlatform {
    async fn generate_component(
        &self,
        component: &ComponentInstance,
        deps: &DependencyMap,
    ) -> anyhow::Result<Renderable> {
        Ok(Arc::new(format!("{}({})", component.name(), deps.len())))
    }
}

const SHOP: &str = r#"
root: AppModule
modules:
  AppModule:
    imports: [CoreModule, CatalogModule]
    components: [Shell]
    routes:
      - path: /
        use_component: Shell
        children:
          - path: catalog
            use_module: CatalogModule
  CoreModule:
    global: true
    providers: [Http, Session]
  CatalogModule:
    providers: [CatalogApi]
    components: [ProductList, ProductCard]
    routes:
      - path: products
        use_component: ProductList
        title: Products
injectables:
  Http: {}
  Session:
    deps: [Http]
    interceptor: true
  CatalogApi:
    deps: [Http]
components:
  Shell:
    interceptors: [Session]
    interceptors_fallback: Loading
  ProductList:
    declarations: [CatalogApi, ProductCard]
    lazy: true
    suspense_fallback: Spinner
  ProductCard: {}
"#;

#[tokio::test]
async fn yaml_manifest_resolves_end_to_end() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(SHOP.as_bytes()).unwrap();

    let compiled = Manifest::load(file.path()).unwrap().into_registry().unwrap();
    let registry = compiled.registry.clone();
    let mut factory = Factory::new(compiled.registry, Arc::new(NamePlatform));
    let routes = factory.create(compiled.root).await.unwrap();

    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].path, "");
    assert_eq!(routes[0].component.name(), "Shell");
    let children = routes[0].children.as_ref().unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].path, "catalog/products");
    assert_eq!(children[0].component.name(), "ProductList");
    assert_eq!(children[0].options.get("title").unwrap(), "Products");

    let session = registry.find("Session").unwrap();
    let svc = factory.provider::<ManifestService>(session).unwrap();
    assert_eq!(svc.deps, vec!["Http".to_string()]);

    let shell = factory
        .component_instance(registry.find("Shell").unwrap())
        .unwrap();
    assert_eq!(shell.interceptors().len(), 1);
    shell.intercept().await.unwrap();

    let list = registry.find("ProductList").unwrap();
    let unit = factory.generate_component(list).await.unwrap();
    assert_eq!(unit.downcast::<String>().unwrap().as_str(), "ProductList(2)");
}

#[tokio::test]
async fn json_manifest_reports_hidden_provider() {
    let src = r#"{
        "root": "AppModule",
        "modules": {
            "AppModule": { "imports": ["FeatureModule"], "components": ["Home"] },
            "FeatureModule": { "providers": ["Secret"] }
        },
        "injectables": { "Secret": {} },
        "components": { "Home": { "declarations": ["Secret"] } }
    }"#;
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    file.write_all(src.as_bytes()).unwrap();

    let compiled = Manifest::load(file.path()).unwrap().into_registry().unwrap();
    let mut factory = Factory::new(compiled.registry, Arc::new(NamePlatform));
    let err = factory.create(compiled.root).await.unwrap_err();
    assert!(matches!(
        err,
        FactoryError::ProviderNotExported { ref dependency, ref owner, .. }
            if dependency == "Secret" && owner == "FeatureModule"
    ));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Manifest::load(&dir.path().join("absent.yml")).unwrap_err();
    assert!(matches!(err, ManifestError::Io { .. }));
}

#[test]
fn manifest_round_trips_through_yaml() {
    let manifest = Manifest::from_yaml_str(SHOP).unwrap();
    let again = Manifest::from_yaml_str(&manifest.to_yaml().unwrap()).unwrap();
    assert_eq!(again.modules.len(), 3);
    assert_eq!(
        again.modules["CatalogModule"].routes[0].options.get("title").unwrap(),
        "Products"
    );
    assert!(again.injectables["Session"].interceptor);
}
