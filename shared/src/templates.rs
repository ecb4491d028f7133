//! Template catalog and field schema resolution.
//!
//! Every template is a `(type, variation)` pair. [`resolve`] maps such a pair
//! to the ordered list of form fields an admin fills in: the universal base
//! fields, the type's own base fields, then the variation's extra fields.
//! Unknown types and unknown variations fall back silently, so resolution
//! never fails.

use crate::types::{FieldDescriptor, InputKind, TemplateDescriptor, TemplateType};

const fn text(
    key: &'static str,
    label: &'static str,
    required: bool,
    placeholder: Option<&'static str>,
) -> FieldDescriptor {
    FieldDescriptor {
        key,
        label,
        input_kind: InputKind::Text,
        required,
        placeholder,
        description: None,
    }
}

const fn textarea(
    key: &'static str,
    label: &'static str,
    required: bool,
    description: Option<&'static str>,
) -> FieldDescriptor {
    FieldDescriptor {
        key,
        label,
        input_kind: InputKind::Textarea,
        required,
        placeholder: None,
        description,
    }
}

// ========== FIELD LISTS ==========
const UNIVERSAL_BASE: &[FieldDescriptor] = &[
    text("headline", "Título principal", true, Some("Ex: Transforme seu negócio")),
    textarea("descricao", "Descrição principal", true, Some("Texto exibido logo abaixo do título")),
    text("whatsapp", "WhatsApp", true, Some("(11) 99999-9999")),
];

const LANDING_EXTRA: &[FieldDescriptor] = &[
    text("subtitulo", "Subtítulo", false, Some("Uma frase de apoio ao título")),
    text("textoBotao", "Texto do botão", false, Some("Fale conosco")),
];

const LANDING_VIDEO: &[FieldDescriptor] = &[
    text("videoUrl", "URL do vídeo", true, Some("https://www.youtube.com/watch?v=...")),
    text("tituloVideo", "Título da seção de vídeo", false, None),
];

const LANDING_CAPTURA: &[FieldDescriptor] = &[
    text("tituloFormulario", "Título do formulário", true, Some("Receba nosso contato")),
    textarea("beneficios", "Benefícios", false, Some("Um benefício por linha")),
];

const LANDING_PRODUTO: &[FieldDescriptor] = &[
    text("nomeProduto", "Nome do produto", true, None),
    text("preco", "Preço", false, Some("R$ 99,90")),
    textarea("detalhesProduto", "Detalhes do produto", false, None),
];

const INSTITUCIONAL_EXTRA: &[FieldDescriptor] = &[
    textarea("sobre", "Sobre a empresa", false, Some("História, missão e valores")),
    text("endereco", "Endereço", false, Some("Rua, número, bairro, cidade")),
    text("email", "E-mail de contato", false, Some("contato@empresa.com.br")),
];

const INSTITUCIONAL_SERVICOS: &[FieldDescriptor] = &[
    text("tituloServicos", "Título da seção de serviços", true, Some("Nossos serviços")),
    textarea("listaServicos", "Serviços", true, Some("Um serviço por linha")),
];

const INSTITUCIONAL_EQUIPE: &[FieldDescriptor] = &[
    text("tituloEquipe", "Título da seção de equipe", true, Some("Nossa equipe")),
    textarea("descricaoEquipe", "Apresentação da equipe", false, None),
];

const INSTITUCIONAL_PORTFOLIO: &[FieldDescriptor] = &[
    text("tituloPortfolio", "Título do portfólio", true, Some("Trabalhos recentes")),
    textarea("descricaoPortfolio", "Descrição do portfólio", false, None),
];

// ========== VARIATIONS ==========
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandingVariation {
    Video,
    Captura,
    Produto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstitucionalVariation {
    Servicos,
    Equipe,
    Portfolio,
}

/// A parsed `(type, variation)` pair. `None` marks an unknown variation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKey {
    Landing(Option<LandingVariation>),
    Institucional(Option<InstitucionalVariation>),
    Unknown,
}

impl TemplateKey {
    pub fn parse(template_type: &str, variation_id: &str) -> Self {
        match TemplateType::parse(template_type) {
            Some(TemplateType::Landing) => TemplateKey::Landing(match variation_id {
                "video" => Some(LandingVariation::Video),
                "captura" => Some(LandingVariation::Captura),
                "produto" => Some(LandingVariation::Produto),
                _ => None,
            }),
            Some(TemplateType::Institucional) => TemplateKey::Institucional(match variation_id {
                "servicos" => Some(InstitucionalVariation::Servicos),
                "equipe" => Some(InstitucionalVariation::Equipe),
                "portfolio" => Some(InstitucionalVariation::Portfolio),
                _ => None,
            }),
            None => TemplateKey::Unknown,
        }
    }

    /// Field groups in declaration order.
    fn groups(&self) -> &'static [&'static [FieldDescriptor]] {
        match self {
            TemplateKey::Landing(None) => &[UNIVERSAL_BASE, LANDING_EXTRA],
            TemplateKey::Landing(Some(LandingVariation::Video)) => {
                &[UNIVERSAL_BASE, LANDING_EXTRA, LANDING_VIDEO]
            }
            TemplateKey::Landing(Some(LandingVariation::Captura)) => {
                &[UNIVERSAL_BASE, LANDING_EXTRA, LANDING_CAPTURA]
            }
            TemplateKey::Landing(Some(LandingVariation::Produto)) => {
                &[UNIVERSAL_BASE, LANDING_EXTRA, LANDING_PRODUTO]
            }
            TemplateKey::Institucional(None) => &[UNIVERSAL_BASE, INSTITUCIONAL_EXTRA],
            TemplateKey::Institucional(Some(InstitucionalVariation::Servicos)) => {
                &[UNIVERSAL_BASE, INSTITUCIONAL_EXTRA, INSTITUCIONAL_SERVICOS]
            }
            TemplateKey::Institucional(Some(InstitucionalVariation::Equipe)) => {
                &[UNIVERSAL_BASE, INSTITUCIONAL_EXTRA, INSTITUCIONAL_EQUIPE]
            }
            TemplateKey::Institucional(Some(InstitucionalVariation::Portfolio)) => {
                &[UNIVERSAL_BASE, INSTITUCIONAL_EXTRA, INSTITUCIONAL_PORTFOLIO]
            }
            TemplateKey::Unknown => &[UNIVERSAL_BASE],
        }
    }

    pub fn fields(&self) -> Vec<FieldDescriptor> {
        self.groups().iter().flat_map(|group| group.iter().copied()).collect()
    }
}

/// Resolve the ordered form fields for a template type and variation.
pub fn resolve(template_type: &str, variation_id: &str) -> Vec<FieldDescriptor> {
    TemplateKey::parse(template_type, variation_id).fields()
}

// ========== CATALOG ==========
const CATALOG: &[TemplateDescriptor] = &[
    TemplateDescriptor {
        id: "landing-video",
        template_type: TemplateType::Landing,
        variation_id: "video",
        name: "Landing page com vídeo",
        description: "Página de conversão com vídeo em destaque",
    },
    TemplateDescriptor {
        id: "landing-captura",
        template_type: TemplateType::Landing,
        variation_id: "captura",
        name: "Landing page de captura",
        description: "Página focada em captar contatos",
    },
    TemplateDescriptor {
        id: "landing-produto",
        template_type: TemplateType::Landing,
        variation_id: "produto",
        name: "Landing page de produto",
        description: "Apresentação de um único produto com preço",
    },
    TemplateDescriptor {
        id: "institucional-servicos",
        template_type: TemplateType::Institucional,
        variation_id: "servicos",
        name: "Site institucional de serviços",
        description: "Site da empresa com lista de serviços",
    },
    TemplateDescriptor {
        id: "institucional-equipe",
        template_type: TemplateType::Institucional,
        variation_id: "equipe",
        name: "Site institucional com equipe",
        description: "Site da empresa apresentando a equipe",
    },
    TemplateDescriptor {
        id: "institucional-portfolio",
        template_type: TemplateType::Institucional,
        variation_id: "portfolio",
        name: "Site institucional com portfólio",
        description: "Site da empresa com trabalhos realizados",
    },
];

pub fn catalog() -> &'static [TemplateDescriptor] {
    CATALOG
}

pub fn find_template(id: &str) -> Option<&'static TemplateDescriptor> {
    CATALOG.iter().find(|template| template.id == id)
}

/// Image slots an admin can fill for a template type.
pub fn image_slots(template_type: TemplateType) -> &'static [&'static str] {
    match template_type {
        TemplateType::Landing => &["logo", "imagemPrincipal"],
        TemplateType::Institucional => &["logo", "imagemPrincipal", "imagemSobre"],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn keys(fields: &[FieldDescriptor]) -> Vec<&'static str> {
        fields.iter().map(|f| f.key).collect()
    }

    #[test]
    fn test_landing_video_fields() {
        let fields = keys(&resolve("landing", "video"));
        for key in ["headline", "descricao", "whatsapp", "subtitulo", "videoUrl", "tituloVideo"] {
            assert!(fields.contains(&key), "missing {key}");
        }
    }

    #[test]
    fn test_unknown_variation_is_type_base() {
        let fields = resolve("landing", "unknown");
        assert_eq!(fields, TemplateKey::Landing(None).fields());
        assert!(!keys(&fields).contains(&"videoUrl"));

        let fields = resolve("institucional", "");
        assert_eq!(fields, TemplateKey::Institucional(None).fields());
    }

    #[test]
    fn test_unknown_type_is_universal_base() {
        assert_eq!(keys(&resolve("blog", "video")), vec!["headline", "descricao", "whatsapp"]);
        assert_eq!(keys(&resolve("", "")), vec!["headline", "descricao", "whatsapp"]);
    }

    #[test]
    fn test_every_catalog_entry_is_total() {
        for template in catalog() {
            let fields = resolve(template.template_type.as_str(), template.variation_id);
            let base = resolve(template.template_type.as_str(), "");
            assert!(!fields.is_empty());
            assert!(fields.len() > base.len(), "{} adds no fields", template.id);

            let field_keys = keys(&fields);
            assert_eq!(&field_keys[..base.len()], &keys(&base)[..]);
            for key in ["headline", "descricao", "whatsapp"] {
                assert!(field_keys.contains(&key));
            }

            let unique: HashSet<_> = field_keys.iter().collect();
            assert_eq!(unique.len(), field_keys.len(), "duplicate key in {}", template.id);
        }
    }

    #[test]
    fn test_resolution_is_deterministic() {
        assert_eq!(resolve("institucional", "equipe"), resolve("institucional", "equipe"));
    }

    #[test]
    fn test_find_template() {
        let template = find_template("landing-video").unwrap();
        assert_eq!(template.template_type, TemplateType::Landing);
        assert_eq!(template.variation_id, "video");
        assert!(find_template("landing-missing").is_none());
    }

    #[test]
    fn test_field_descriptor_json_shape() {
        let json = serde_json::to_value(resolve("landing", "")[2]).unwrap();
        assert_eq!(json["key"], "whatsapp");
        assert_eq!(json["inputKind"], "text");
        assert_eq!(json["required"], true);
        assert!(json.get("description").is_none());
    }
}
