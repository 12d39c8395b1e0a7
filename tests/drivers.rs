use gdal::DriverManager;

#[test]
fn test_required_drivers() {
    // GML reads the downloads, GPKG writes the exports
    for name in ["GML", "GPKG"] {
        let driver = DriverManager::get_driver_by_name(name).unwrap();
        assert_eq!(driver.short_name(), name);
    }
}
