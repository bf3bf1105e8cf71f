use geocodage::Parser;
use geocodage::normalize::{uniform, uniform_adresse, uniform_commune, uniform_repetition};
use geocodage::search::similarity;
use tracing::info;

#[test_log::test]
fn uniform_strips_diacritics_and_separators() {
    assert_eq!(uniform("Ambérieu-en-Bugey"), "AMBERIEU EN BUGEY");
    assert_eq!(uniform("la Chèvre"), "LA CHEVRE");
    assert_eq!(uniform("  Rue   de l'Église  "), "RUE DE L EGLISE");
    assert_eq!(uniform("Saint-Rémy-de-Provence"), "SAINT REMY DE PROVENCE");
    assert_eq!(uniform(""), "");
    info!("Uniform reads.");
}

#[test_log::test]
fn uniform_is_idempotent() {
    let samples = [
        "Ambérieu-en-Bugey",
        "Châtillon-sur-Chalaronne",
        "Rue du Professeur Christian Cabrol",
        "L'Haÿ-les-Roses",
        "630, la Chèvre",
    ];
    for sample in samples {
        let once = uniform(sample);
        assert_eq!(uniform(&once), once);
        let once = uniform_commune(sample);
        assert_eq!(uniform_commune(&once), once);
    }
}

#[test_log::test]
fn uniform_commune_drops_stopwords() {
    assert_eq!(uniform_commune("Ambérieu-en-Bugey"), "AMBERIEU BUGEY");
    assert_eq!(
        uniform_commune("Saint-Rémy-de-Provence"),
        "REMY PROVENCE"
    );
    assert_eq!(uniform_commune("Châtillon-sur-Chalaronne"), "CHATILLON CHALARONNE");
    // A name made only of stopwords keeps its uniform form, like Le Saint in Morbihan.
    assert_eq!(uniform_commune("Le Saint"), "LE SAINT");
}

#[test_log::test]
fn uniform_adresse_collapses_street_types() {
    assert_eq!(
        uniform_adresse("Rue du Professeur Christian Cabrol"),
        "R DU PROFESSEUR CHRISTIAN CABROL"
    );
    assert_eq!(uniform_adresse("Avenue Roger Salengro"), "AV ROGER SALENGRO");
    assert_eq!(uniform_adresse("Boulevard Voltaire"), "BD VOLTAIRE");
    assert_eq!(uniform_adresse("Impasse des Lilas"), "IMP DES LILAS");
    // "Grande Rue" is a name, not a typed prefix.
    assert_eq!(uniform_adresse("Grande Rue"), "GRANDE RUE");
}

#[test_log::test]
fn uniform_adresse_strips_the_house_number() {
    assert_eq!(uniform_adresse("630, la Chèvre"), "LA CHEVRE");
    assert_eq!(
        uniform_adresse("12 Rue de la Paix"),
        "R DE LA PAIX"
    );
    assert_eq!(uniform_adresse("12bis Rue de la Paix"), "B R DE LA PAIX");
    assert_eq!(uniform_adresse("12 bis Rue de la Paix"), "B R DE LA PAIX");
}

#[test_log::test]
fn uniform_repetition_reduces_markers() {
    assert_eq!(uniform_repetition("bis"), "B");
    assert_eq!(uniform_repetition("TER"), "T");
    assert_eq!(uniform_repetition("quater"), "Q");
    assert_eq!(uniform_repetition("A"), "A");
    assert_eq!(uniform_repetition(""), "");
}

#[test_log::test]
fn parser_reads_house_numbers() {
    assert_eq!(
        Parser::house_number("1 Rue du Professeur Christian Cabrol"),
        Some((1, String::new()))
    );
    assert_eq!(
        Parser::house_number("3 bis Rue du Professeur Christian Cabrol"),
        Some((3, "B".to_string()))
    );
    assert_eq!(Parser::house_number("12B Avenue Foch"), Some((12, "B".to_string())));
    // A following word that is not a marker stays in the street text.
    assert_eq!(Parser::house_number("630, la Chèvre"), Some((630, String::new())));
    assert_eq!(Parser::house_number("Rue sans numéro"), None);
    assert_eq!(Parser::house_number(""), None);
}

#[test_log::test]
fn similarity_scores_and_orders() {
    // Identical names score 1.
    assert!((similarity("AMBERIEU BUGEY", "AMBERIEU BUGEY") - 1.0).abs() < f64::EPSILON);
    // A close misspelling clears the acceptance threshold.
    assert!(similarity("AMBERIEU BUGEY", "AMBERIEU BUGAY") > 0.6);
    // Unrelated names do not.
    assert!(similarity("AMBERIEU BUGEY", "CHATILLON CHALARONNE") < 0.6);
    // The empty key matches nothing.
    assert!(similarity("", "AMBERIEU BUGEY") < 0.6);
}
