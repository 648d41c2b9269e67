//! SICONV list endpoints.

use super::method::{MethodRegistry, QueryMethod};
use super::params::{Comparison, ParamSpec, ParamType, ParamValue};
use crate::domain::entity::siconv::ESTADOS;
use crate::domain::entity::{Catalog, CatalogError};
use rust_decimal::Decimal;

use ParamType::{Date, Integer, Text};

fn fold_state(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn is_state(value: &ParamValue) -> bool {
    value
        .as_text()
        .map(|v| ESTADOS.iter().any(|(sigla, _)| sigla.to_lowercase() == v))
        .unwrap_or(false)
}

fn upper(value: ParamValue) -> ParamValue {
    match value {
        ParamValue::Text(s) => ParamValue::Text(s.to_uppercase()),
        other => other,
    }
}

fn is_cpf(value: &ParamValue) -> bool {
    value.as_text().map(|v| v.chars().count() == 11).unwrap_or(false)
}

/// Stored CPFs only keep the middle six digits: `***456789**`.
fn mask_cpf(value: ParamValue) -> ParamValue {
    match value {
        ParamValue::Text(s) => {
            let middle: String = s.chars().skip(3).take(6).collect();
            ParamValue::Text(format!("***{}**", middle))
        }
        other => other,
    }
}

fn uf(description: &str, path: &str) -> ParamSpec {
    ParamSpec::new("uf", Text)
        .describe(description)
        .path(path)
        .pre_transform(fold_state)
        .validator(is_state)
        .transform(upper)
}

fn cpf(name: &str, description: &str, path: &str) -> ParamSpec {
    ParamSpec::new(name, Text)
        .describe(description)
        .path(path)
        .validator(is_cpf)
        .transform(mask_cpf)
}

fn nome() -> ParamSpec {
    ParamSpec::new("nome", Text).describe("Nome ou parte do nome").contains()
}

fn descricao(description: &str) -> ParamSpec {
    ParamSpec::new("descricao", Text).describe(description).contains()
}

fn id(name: &str, description: &str) -> ParamSpec {
    ParamSpec::new(name, Integer).describe(description)
}

fn text_id(name: &str, description: &str) -> ParamSpec {
    ParamSpec::new(name, Text).describe(description)
}

/// Lookup tables filtered only by name.
fn by_name(catalog: &Catalog, slug: &str, entity: &str, name: &str, description: &str) -> Result<QueryMethod, CatalogError> {
    QueryMethod::builder(slug, entity)
        .name(name)
        .description(description)
        .param(nome())
        .build(catalog)
}

pub fn registry(catalog: &Catalog) -> Result<MethodRegistry, CatalogError> {
    let mut r = MethodRegistry::new();

    r.register(
        QueryMethod::builder("municipios", "Municipio")
            .name("Consulta Municípios")
            .description("Este método consulta todos os municípios, opcionalmente filtrados por nome ou uf.")
            .param(uf("Unidade da Federação", "uf"))
            .param(nome())
            .build(catalog)?,
    )?;

    r.register(by_name(
        catalog,
        "orgaos",
        "Orgao",
        "Consulta Orgaos",
        "Este método consulta todos os orgaos, opcionalmente filtrados por nome.",
    )?)?;
    r.register(by_name(
        catalog,
        "esferas_administrativas",
        "EsferaAdministrativa",
        "Consulta Esferas Administrativas",
        "Este método consulta todas as esferas administrativas, opcionalmente filtradas por nome.",
    )?)?;
    r.register(by_name(
        catalog,
        "naturezas_juridicas",
        "NaturezaJuridica",
        "Consulta Naturezas Jurídicas",
        "Este método consulta todas as naturezas jurídicas, opcionalmente filtradas por nome.",
    )?)?;
    r.register(by_name(
        catalog,
        "situacoes_propostas",
        "SituacaoProposta",
        "Consulta Situacoes das Propostas",
        "Este método consulta todas as situações das propostas, opcionalmente filtradas por nome.",
    )?)?;
    r.register(by_name(
        catalog,
        "situacoes_convenios",
        "SituacaoConvenio",
        "Consulta Situações dos Convênios",
        "Este método consulta todas as situações dos convênios, opcionalmente filtradas por nome.",
    )?)?;
    r.register(by_name(
        catalog,
        "subsituacoes_convenios",
        "SubsituacaoConvenio",
        "Consulta Subsituações dos Convênios",
        "Este método consulta todas as subsituações dos convênios, opcionalmente filtradas por nome.",
    )?)?;
    r.register(
        QueryMethod::builder("situacoes_publicacao_convenio", "SituacaoPublicacaoConvenio")
            .id("consulta_situacoes_publicacao_convenios")
            .name("Consulta Situações de Publicação dos Convênios")
            .description(
                "Este método consulta todas as situações de publicação dos convênios, opcionalmente filtradas por nome.",
            )
            .param(nome())
            .build(catalog)?,
    )?;

    r.register(
        QueryMethod::builder("proponentes", "Proponente")
            .name("Consulta Proponentes")
            .description(
                "Este método consulta todos os proponentes, opcionalmente filtrados por uf, nome, \
                 responsável, município, natureza jurídica ou esfera administrativa.",
            )
            .param(uf("Unidade da Federação do município", "municipio.uf"))
            .param(
                ParamSpec::new("nome", Text)
                    .describe("Nome ou parte do nome do proponente")
                    .contains(),
            )
            .param(
                ParamSpec::new("nome_responsavel", Text)
                    .describe("Nome ou parte do nome do responsável pelo proponente")
                    .contains(),
            )
            .param(id("id_municipio", "Identificador do município"))
            .param(text_id("id_responsavel", "Id do Responsável"))
            .param(id("id_natureza_juridica", "Identificador da Natureza Jurídica"))
            .param(id("id_esfera_administrativa", "Identificador da Esfera Administrativa"))
            .build(catalog)?,
    )?;

    r.register(
        QueryMethod::builder("propostas", "Proposta")
            .name("Consulta Propostas")
            .description(
                "Este método consulta todas as propostas, opcionalmente filtradas por uf, programa, \
                 proponente, responsáveis, órgão concedente, situação ou modalidade.",
            )
            .param(uf("Unidade da Federação do município do proponente", "proponente.municipio.uf"))
            .param(
                id("id_programa", "Identificador de um programa associado à proposta")
                    .path("_programas.id_programa"),
            )
            .param(id("id_proponente", "Identificador do proponente"))
            .param(
                text_id("id_responsavel", "Id do Responsável pela instituição proponente")
                    .path("proponente.id_responsavel"),
            )
            .param(id("id_orgao_concedente", "Identificador do órgão concedente"))
            .param(id("id_situacao", "Identificador da situação da proposta"))
            .param(id("id_modalidade", "Identificador da modalidade de proposta ou convênio"))
            .param(text_id("id_pessoa_responsavel_pelo_concedente", "Id do Responsável pela proposta"))
            .param(text_id(
                "id_pessoa_responsavel_pelo_envio",
                "Id do Responsável pelo envio da proposta",
            ))
            .param(text_id(
                "id_pessoa_responsavel_pelo_cadastramento",
                "Id do Responsável pelo cadastramento da proposta",
            ))
            .build(catalog)?,
    )?;

    r.register(
        QueryMethod::builder("convenios", "Convenio")
            .name("Consulta Convênios")
            .description(
                "Este método consulta todos os convênios, opcionalmente filtrados por uf, programa, \
                 proponente, responsáveis, órgão concedente, situação ou modalidade.",
            )
            .param(uf("Unidade da Federação do município do proponente", "proponente.municipio.uf"))
            .param(
                id("id_programa", "Identificador de um programa associado ao convênio")
                    .path("_programas.id_programa"),
            )
            .param(id("id_proponente", "Identificador do proponente"))
            .param(
                text_id(
                    "id_pessoa_responsavel_como_proponente",
                    "Id do Responsável pela instituição proponente",
                )
                .path("proponente.id_responsavel"),
            )
            .param(cpf(
                "cpf_responsavel",
                "CPF do Responsável pela instituição proponente",
                "proponente.pessoa_responsavel.cpf",
            ))
            .param(id("id_orgao_concedente", "Identificador do órgão concedente"))
            .param(id("id_situacao", "Identificador da situação do convênio"))
            .param(id("id_modalidade", "Identificador da modalidade de proposta ou convênio"))
            .param(text_id("id_pessoa_responsavel_como_concedente", "Id do Responsável pelo convênio"))
            .param(cpf(
                "cpf_pessoa_responsavel_como_concedente",
                "CPF do Responsável pelo convênio",
                "pessoa_responsavel_como_concedente.cpf",
            ))
            .build(catalog)?,
    )?;

    r.register(
        QueryMethod::builder("programas", "Programa")
            .name("Consulta Programas")
            .description(
                "Este método consulta todos os programas, opcionalmente filtrados por uf habilitada, \
                 nome, situação, ação orçamentária, data de publicação ou órgãos associados.",
            )
            .param(
                ParamSpec::new("estados_habilitados", Text)
                    .describe("Unidades da Federação habilitadas a receber recursos do programa")
                    .path("estados_habilitados.sigla")
                    .pre_transform(fold_state)
                    .validator(is_state)
                    .transform(upper),
            )
            .param(nome())
            .param(
                ParamSpec::new("situacao", Text)
                    .describe("Situação do programa")
                    .contains(),
            )
            .param(ParamSpec::new("acao_orcamentaria", Text).describe("Código da ação Orçamentária"))
            .param(
                ParamSpec::new("data_publicacao_dou", Date)
                    .describe("Data de publicação no Diário Oficial da União"),
            )
            .param(
                ParamSpec::new("data_publicacao_dou_min", Date)
                    .describe("Data mínima de publicação no Diário Oficial da União")
                    .path("data_publicacao_dou")
                    .compare(Comparison::GreaterOrEqual),
            )
            .param(
                ParamSpec::new("data_publicacao_dou_max", Date)
                    .describe("Data máxima de publicação no Diário Oficial da União")
                    .path("data_publicacao_dou")
                    .compare(Comparison::LessOrEqual),
            )
            .param(id("id_orgao_superior", "id do órgão superior associado ao programa"))
            .param(id("id_orgao_vinculado", "id do órgão vinculado ao programa"))
            .param(id("id_orgao_mandatario", "id do órgão mandatário associado ao programa"))
            .param(id("id_orgao_executor", "id do órgão executor associado ao programa"))
            .build(catalog)?,
    )?;

    r.register(by_name(
        catalog,
        "modalidades",
        "Modalidade",
        "Consulta Modalidades de Propostas e Convênios",
        "Este método consulta todas as modalidades de propostas e convênios, opcionalmente filtradas por nome.",
    )?)?;

    r.register(
        QueryMethod::builder("pessoas_responsaveis", "PessoaResponsavel")
            .name("Consulta pessoas responsaveis por Propostas ou Convênios")
            .description(
                "Este método consulta todas as pessoas responsáveis por propostas ou convênios, \
                 opcionalmente filtradas por nome, cargo ou CPF.",
            )
            .param(nome())
            .param(
                ParamSpec::new("cargo", Text)
                    .describe("Cargo ou parte do texto do cargo")
                    .contains(),
            )
            .param(cpf(
                "cpf",
                "CPF da pessoa Responsável pelo convênio ou pela proposta",
                "cpf",
            ))
            .build(catalog)?,
    )?;

    let zero = || ParamValue::Decimal(Decimal::ZERO);
    r.register(
        QueryMethod::builder("emendas", "Emenda")
            .name("Consulta emendas dos programas")
            .description(
                "Este método consulta todas as emendas dos programas, opcionalmente filtradas por \
                 programa, número ou valor.",
            )
            .param(id("id_programa", "Id do programa"))
            .param(id("numero", "número da emenda"))
            .param(
                ParamSpec::new("valor_minimo", ParamType::Decimal)
                    .describe("valor mínimo da emenda")
                    .path("valor")
                    .compare(Comparison::GreaterOrEqual)
                    .min(zero()),
            )
            .param(
                ParamSpec::new("valor_maximo", ParamType::Decimal)
                    .describe("valor máximo da emenda")
                    .path("valor")
                    .compare(Comparison::LessOrEqual)
                    .min(zero()),
            )
            .build(catalog)?,
    )?;

    r.register(
        QueryMethod::builder("ordens_bancarias", "OrdemBancaria")
            .name("Consulta ordens bancarias")
            .description(
                "Este método consulta todas as ordens bancárias, opcionalmente filtradas por \
                 convênio, número ou valor.",
            )
            .param(id("id_convenio", "Id do convenio"))
            .param(text_id("numero", "número da ordem bancária"))
            .param(
                ParamSpec::new("valor_minimo", ParamType::Decimal)
                    .describe("valor mínimo da ordem bancária")
                    .path("valor")
                    .compare(Comparison::GreaterOrEqual)
                    .min(zero()),
            )
            .param(
                ParamSpec::new("valor_maximo", ParamType::Decimal)
                    .describe("valor máximo da ordem bancária")
                    .path("valor")
                    .compare(Comparison::LessOrEqual)
                    .min(zero()),
            )
            .build(catalog)?,
    )?;

    r.register(
        QueryMethod::builder("especies_empenho", "EspecieEmpenho")
            .name("Consulta espécies de empenho")
            .description(
                "Este método consulta todas as espécies de empenho, filtrando por nome ou parte do nome.",
            )
            .param(descricao("Texto ou parte do texto"))
            .build(catalog)?,
    )?;

    r.register(
        QueryMethod::builder("empenhos", "Empenho")
            .name("Consulta empenhos")
            .description("Este método consulta todos os empenhos, filtrando por número, convênio ou espécie.")
            .param(text_id("numero", "Número"))
            .param(id("id_especie", "Identificador da espécie de empenho"))
            .param(id("id_convenio", "Identificador do convênio"))
            .param(id("id_proponente_favorecido", "Identificador do proponente"))
            .build(catalog)?,
    )?;

    r.register(
        QueryMethod::builder("areas_atuacao_proponente", "AreaAtuacaoProponente")
            .name("Consulta areas de atuacao")
            .description(
                "Este método consulta todas as areas de atuacao dos proponentes, opcionalmente \
                 filtradas por descrição ou parte da descrição.",
            )
            .param(descricao("Descrição"))
            .build(catalog)?,
    )?;

    r.register(
        QueryMethod::builder("subareas_atuacao_proponente", "SubAreaAtuacaoProponente")
            .name("Consulta subáreas de atuacao")
            .description(
                "Este método consulta todas as subáreas de atuacao dos proponentes, opcionalmente \
                 filtradas por descrição ou parte da descrição.",
            )
            .param(descricao("Descrição"))
            .param(id("id_area", "Identificador da área de atuação"))
            .build(catalog)?,
    )?;

    r.register(
        QueryMethod::builder("habilitacoes_area_atuacao", "HabilitacaoAreaAtuacao")
            .name("Habilitações em áreas de atuação")
            .description(
                "Este método consulta todas as habilitações concedidas por órgãos a proponentes em \
                 áreas e subáreas de atuação, opcionalmente filtradas por órgão, proponente ou área \
                 de atuação.",
            )
            .param(id("id_subarea", "Identificador da subárea de atuação"))
            .param(id("id_orgao", "Identificador do órgão"))
            .param(id("id_proponente", "Identificador do proponente"))
            .build(catalog)?,
    )?;

    Ok(r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::siconv;
    use crate::domain::query::params::{bind, QueryError};

    fn q(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn every_method_registers() {
        let catalog = siconv::catalog().unwrap();
        let registry = registry(&catalog).unwrap();
        assert_eq!(registry.len(), 21);
        let ids: Vec<&str> = registry.iter().map(|m| m.id.as_str()).collect();
        assert!(ids.contains(&"consulta_situacoes_publicacao_convenios"));
        assert!(ids.contains(&"consulta_ordens_bancarias"));
        assert!(ids.contains(&"consulta_habilitacoes_area_atuacao"));
        assert!(ids.contains(&"consulta_subareas_atuacao_proponente"));
    }

    #[test]
    fn state_filter_folds_case_and_rejects_unknown() {
        let catalog = siconv::catalog().unwrap();
        let registry = registry(&catalog).unwrap();
        let m = registry.get("municipios").unwrap();
        let b = bind(&m.params, &q(&[("uf", "sp")])).unwrap();
        assert_eq!(b.get("uf"), Some(&ParamValue::Text("SP".into())));
        let err = bind(&m.params, &q(&[("uf", "xx")])).unwrap_err();
        assert!(matches!(err, QueryError::InvalidValue { ref parameter, .. } if parameter == "uf"));
    }

    #[test]
    fn cpf_is_masked_before_querying() {
        let catalog = siconv::catalog().unwrap();
        let registry = registry(&catalog).unwrap();
        let m = registry.get("pessoas_responsaveis").unwrap();
        let b = bind(&m.params, &q(&[("cpf", "12345678901")])).unwrap();
        assert_eq!(b.get("cpf"), Some(&ParamValue::Text("***456789**".into())));
        assert!(bind(&m.params, &q(&[("cpf", "123")])).is_err());
    }

    #[test]
    fn negative_amount_is_below_minimum() {
        let catalog = siconv::catalog().unwrap();
        let registry = registry(&catalog).unwrap();
        let m = registry.get("emendas").unwrap();
        let err = bind(&m.params, &q(&[("valor_minimo", "-5")])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "O valor passado como parâmetro 'valor_minimo' é menor que o mínimo aceitável (0): -5."
        );
    }
}
