/// The static robot → card-slot table.
///
/// Every robot the card grid and ticker know about appears here exactly once;
/// robots reported by the backend but absent from this table are silently
/// ignored by those components (they can still be charted on the timeline).
/// The slot id doubles as the stable ordering of the grid.
pub const CARD_SLOTS: &[(&str, &str)] = &[
    ("RFB", "container-RFB"),
    ("WHATSAPP", "container-WHATSAPP"),
    ("SEFAZ", "container-SEFAZ"),
    ("VTCALL", "container-VTCALL"),
    ("MEU NEGOCIO", "container-MEU-NEGOCIO"),
    ("MIDIAS", "container-MIDIAS"),
    ("WHOISBR", "container-WHOISBR"),
    ("WHOIS INT", "container-WHOISINT"),
    ("SITE", "container-SITES"),
    ("EMAIL", "container-EMAIL"),
    ("PORTABILIDADE", "container-PORTABILIDADE"),
    ("INPI", "container-INPI-EMPRESA"),
    ("INPIMARCA", "container-INPI-MARCA"),
    ("PROTESTO", "container-PROTESTO"),
    ("SMS", "container-SMS"),
    ("LINKEDIN", "container-LINKEDIN"),
    ("CEP CRUZAMENTO", "container-CRUZAR-CEP"),
    ("EMAIL VALIDACAO", "container-VALIDA-EMAIL"),
    ("GENERO IDENTIFICACAO", "container-GENERO-IDENTIFICACAO"),
    ("GEOLOCALIZACAO", "container-GEOLOCAL-EMPRESA"),
    ("RAMO EMPRESA", "container-EMPRESA-PESQUISA"),
    ("TELEFONE VALIDACAO", "container-VALIDA-TELEFONE"),
    ("FACE IDADE", "container-FACE-IDADE-GENERO"),
    ("WHATSAPP LINKEDIN", "container-WHATSAPP-LINKEDIN"),
    ("WHATSAPP IMAGEM", "container-WHATSAPP-IMAGEM"),
    ("CRFBGOOGLE", "container-RFB-GOOGLE"),
    ("OAB", "container-OAB"),
    ("GOOGLE CATEGORIA", "container-GOOGLE-CATEGORIA"),
    ("INSTAGRAM", "container-INSTAGRAM"),
    ("FACEBOOK", "container-FACEBOOK"),
];

/// Robots charted by default when the dashboard starts.
pub const DEFAULT_TIMELINE_ROBOTS: [&str; 6] =
    ["RFB", "WHATSAPP", "VTCALL", "SEFAZ", "MEU NEGOCIO", "MIDIAS"];

/// Card-slot id for a robot, or None if the robot is not tracked.
pub fn card_slot(robot: &str) -> Option<&'static str> {
    CARD_SLOTS
        .iter()
        .find(|(name, _)| *name == robot)
        .map(|(_, slot)| *slot)
}

/// Display heading for a slot: strip the "container-" prefix, turn dashes
/// into spaces, uppercase. "container-MEU-NEGOCIO" -> "MEU NEGOCIO".
pub fn slot_title(slot: &str) -> String {
    slot.strip_prefix("container-")
        .unwrap_or(slot)
        .replace('-', " ")
        .to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_robot_resolves_to_its_slot() {
        assert_eq!(card_slot("RFB"), Some("container-RFB"));
        assert_eq!(card_slot("MEU NEGOCIO"), Some("container-MEU-NEGOCIO"));
    }

    #[test]
    fn unknown_robot_is_not_tracked() {
        assert_eq!(card_slot("NOT A ROBOT"), None);
    }

    #[test]
    fn slot_titles_come_from_the_slot_id() {
        assert_eq!(slot_title("container-RFB"), "RFB");
        assert_eq!(slot_title("container-FACE-IDADE-GENERO"), "FACE IDADE GENERO");
    }

    #[test]
    fn table_has_no_duplicate_robots() {
        let mut names: Vec<&str> = CARD_SLOTS.iter().map(|(n, _)| *n).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), CARD_SLOTS.len());
    }
}
