//! SICONV descriptor set: every entity the open-data API serves.

use super::{
    Association, Catalog, CatalogError, ColumnType, EntityDescriptor, FieldKind, Record, Value,
};
use crate::domain::render::rdf::{iri, vocab};
use crate::domain::render::RenderError;
use oxrdf::vocab::rdfs;
use oxrdf::{Literal, Triple};

use ColumnType::{Boolean, Date, Decimal, Integer, Text};

/// Federative units and their DBpedia resource names.
pub const ESTADOS: [(&str, &str); 27] = [
    ("AP", "Amap%C3%A1"),
    ("CE", "Cear%C3%A1"),
    ("TO", "Tocantins"),
    ("GO", "Goi%C3%A1s"),
    ("MS", "Mato_Grosso_do_Sul"),
    ("MG", "Minas_Gerais"),
    ("PE", "Pernambuco"),
    ("PI", "Piau%C3%AD"),
    ("PA", "Par%C3%A1"),
    ("BA", "Bahia"),
    ("AL", "Alagoas"),
    ("ES", "Esp%C3%ADrito_Santo"),
    ("DF", "Brazilian_Federal_District"),
    ("MT", "Mato_Grosso"),
    ("RN", "Rio_Grande_do_Norte"),
    ("RO", "Rond%C3%B4nia"),
    ("SE", "Sergipe"),
    ("RS", "Rio_Grande_do_Sul"),
    ("RR", "Roraima"),
    ("MA", "Maranh%C3%A3o"),
    ("PB", "Para%C3%ADba"),
    ("AC", "Acre_(state)"),
    ("SC", "Santa_Catarina_(state)"),
    ("AM", "Amazonas_(Brazilian_state)"),
    ("RJ", "Rio_de_Janeiro_(state)"),
    ("PR", "Paran%C3%A1_(state)"),
    ("SP", "S%C3%A3o_Paulo_(state)"),
];

const REGIOES: [(&str, &str); 5] = [
    ("N", "Norte"),
    ("NE", "Nordeste"),
    ("CO", "Centro-Oeste"),
    ("SE", "Sudeste"),
    ("S", "Sul"),
];

const GOVERNMENTAL_ORGANIZATION: &str = "http://umbel.org/umbel/rc/GovernmentalOrganization";

pub fn dbpedia_estado(uf: &str) -> Option<String> {
    ESTADOS
        .iter()
        .find(|(sigla, _)| *sigla == uf)
        .map(|(_, resource)| format!("{}{}", vocab::DBPEDIA, resource))
}

/// Cuts long text at a word boundary and appends ` ...`.
pub fn limit_text(text: &str, size: usize) -> String {
    if text.chars().count() < size {
        return text.to_string();
    }
    let head: String = text.chars().take(size.saturating_sub(5)).collect();
    let cut = match head.rsplit_once(' ') {
        Some((h, _)) => h.to_string(),
        None => head,
    };
    format!("{} ...", cut)
}

/// `12.345.678/0001-90` from the numeric proponent id.
pub fn format_cnpj(id: i64) -> String {
    let digits = format!("{:014}", id);
    format!(
        "{}.{}.{}/{}-{}",
        &digits[..2],
        &digits[2..5],
        &digits[5..8],
        &digits[8..12],
        &digits[12..]
    )
}

fn related_column(r: &Record, relationship: &str, column: &str) -> Value {
    r.related_record(relationship)
        .map(|target| target.column(column))
        .unwrap_or(Value::Null)
}

fn summarized(r: &Record, column: &str) -> Value {
    r.column_text(column)
        .map(|t| Value::Text(limit_text(&t, 140)))
        .unwrap_or(Value::Null)
}

fn dbo(local: &str) -> String {
    format!("{}{}", vocab::DBONT, local)
}

/// `doc rdfs:seeAlso <link>` for a link field.
fn see_also(r: &Record, field: &str) -> Result<Vec<Triple>, RenderError> {
    Ok(match (r.doc_uri(), r.get(field)) {
        (Some(doc), Value::Link(href)) => vec![Triple::new(iri(&doc)?, rdfs::SEE_ALSO, iri(&href)?)],
        _ => Vec::new(),
    })
}

fn municipio_uf(r: &Record) -> Value {
    let mut uf = vec![
        ("sigla".to_string(), r.column("uf")),
        ("nome".to_string(), r.column("uf_nome")),
    ];
    if let Some(sigla) = r.column_text("regiao") {
        let nome = REGIOES
            .iter()
            .find(|(s, _)| *s == sigla)
            .map(|(_, n)| n.to_string())
            .unwrap_or_else(|| sigla.clone());
        uf.push((
            "regiao".to_string(),
            Value::Map(vec![
                ("sigla".to_string(), Value::Text(sigla)),
                ("nome".to_string(), Value::Text(nome)),
            ]),
        ));
    }
    Value::Map(uf)
}

fn municipio_uf_triples(r: &Record) -> Result<Vec<Triple>, RenderError> {
    let (Some(uf), Some(subject)) = (r.column_text("uf"), r.uri()) else {
        return Ok(Vec::new());
    };
    let Some(estado) = dbpedia_estado(&uf) else {
        return Ok(Vec::new());
    };
    let estado = iri(&estado)?;
    let mut out = vec![
        Triple::new(iri(&subject)?, vocab::dbo("state"), estado.clone()),
        Triple::new(
            estado.clone(),
            vocab::dbo("abbreviation"),
            Literal::new_simple_literal(uf.clone()),
        ),
        Triple::new(
            estado.clone(),
            vocab::dbprop("isocode"),
            Literal::new_simple_literal(format!("BR-{}", uf)),
        ),
    ];
    if let Some(nome) = r.column_text("uf_nome") {
        out.push(Triple::new(
            estado,
            rdfs::LABEL,
            Literal::new_language_tagged_literal_unchecked(nome, "pt-br"),
        ));
    }
    Ok(out)
}

fn uf_same_as(r: &Record) -> Result<Vec<Triple>, RenderError> {
    Ok(match (r.uri(), r.column_text("sigla").and_then(|s| dbpedia_estado(&s))) {
        (Some(subject), Some(estado)) => {
            vec![Triple::new(iri(&subject)?, vocab::owl("sameAs"), iri(&estado)?)]
        }
        _ => Vec::new(),
    })
}

fn valores(r: &Record, contrapartida_bens: &str) -> Value {
    Value::Map(vec![
        ("global".to_string(), r.column("valor_global")),
        ("repasse".to_string(), r.column("valor_repasse")),
        ("contrapartida".to_string(), r.column("valor_contrapartida")),
        (
            "contrapartida_financeira".to_string(),
            r.column("valor_contrapartida_financeira"),
        ),
        (contrapartida_bens.to_string(), r.column("valor_contrapartida_bens")),
    ])
}

fn municipio() -> Result<EntityDescriptor, CatalogError> {
    EntityDescriptor::builder("Municipio", "municipio")
        .resource("municipio", "municipios")
        .class_uri(&dbo("Settlement"))
        .primary_key(&["id"])
        .column("id", Integer)
        .stored("nome", Text)
        .column("uf", Text)
        .column("uf_nome", Text)
        .column("regiao", Text)
        .computed("uf", FieldKind::Map, municipio_uf)
        .alias("cod_siconv", "id")
        .computed("href_proponentes", FieldKind::Link, |r| {
            r.list_link("proponentes", "id_municipio", "id")
        })
        .exposed(&["nome", "uf", "cod_siconv", "href_proponentes"])
        .rdf_function("uf", municipio_uf_triples)
        .method("see_also", see_also)
        .rdf_named("href_proponentes", "see_also")
        .build()
}

fn unidade_federativa() -> Result<EntityDescriptor, CatalogError> {
    EntityDescriptor::builder("UnidadeFederativa", "uf")
        .resource("uf", "ufs")
        .element_name("uf")
        .primary_key(&["sigla"])
        .stored("sigla", Text)
        .stored("nome", Text)
        .exposed(&["nome", "sigla"])
        .rdf_function("sigla", uf_same_as)
        .build()
}

fn esfera_administrativa() -> Result<EntityDescriptor, CatalogError> {
    EntityDescriptor::builder("EsferaAdministrativa", "esfera_administrativa")
        .resource("esfera_administrativa", "esferas_administrativas")
        .primary_key(&["id"])
        .column("id", Integer)
        .stored("nome", Text)
        .computed("href_proponentes", FieldKind::Link, |r| {
            r.list_link("proponentes", "id_esfera_administrativa", "id")
        })
        .exposed(&["nome", "href_proponentes"])
        .build()
}

fn natureza_juridica() -> Result<EntityDescriptor, CatalogError> {
    EntityDescriptor::builder("NaturezaJuridica", "natureza_juridica")
        .resource("natureza_juridica", "naturezas_juridicas")
        .primary_key(&["id"])
        .column("id", Integer)
        .stored("nome", Text)
        .computed("href_proponentes", FieldKind::Link, |r| {
            r.list_link("proponentes", "id_natureza_juridica", "id")
        })
        .exposed(&["nome", "href_proponentes"])
        .build()
}

fn pessoa_responsavel() -> Result<EntityDescriptor, CatalogError> {
    EntityDescriptor::builder("PessoaResponsavel", "pessoa_responsavel")
        .resource("pessoa_responsavel", "pessoas_responsaveis")
        .class_uri(&format!("{}Person", vocab::FOAF))
        .primary_key(&["id"])
        .column("id", Text)
        .stored("nome", Text)
        .stored("identificacao", Text)
        .stored("cpf", Text)
        .stored("cargo", Text)
        .computed("href_propostas_como_responsavel_pelo_concedente", FieldKind::Link, |r| {
            r.list_link("propostas", "id_pessoa_responsavel_pelo_concedente", "id")
        })
        .computed("href_convenios_como_responsavel_pelo_concedente", FieldKind::Link, |r| {
            r.list_link("convenios", "id_pessoa_responsavel_como_concedente", "id")
        })
        .computed("href_propostas_enviadas", FieldKind::Link, |r| {
            r.list_link("propostas", "id_pessoa_responsavel_pelo_envio", "id")
        })
        .computed("href_propostas_cadastradas", FieldKind::Link, |r| {
            r.list_link("propostas", "id_pessoa_responsavel_pelo_cadastramento", "id")
        })
        .computed("href_convenios_como_responsavel_pelo_proponente", FieldKind::Link, |r| {
            r.list_link("convenios", "id_pessoa_responsavel_como_proponente", "id")
        })
        .exposed(&[
            "nome",
            "identificacao",
            "cpf",
            "cargo",
            "href_propostas_como_responsavel_pelo_concedente",
            "href_convenios_como_responsavel_pelo_concedente",
            "href_propostas_enviadas",
            "href_propostas_cadastradas",
            "href_convenios_como_responsavel_pelo_proponente",
        ])
        .build()
}

fn proponente() -> Result<EntityDescriptor, CatalogError> {
    EntityDescriptor::builder("Proponente", "proponente")
        .resource("proponente", "proponentes")
        .class_uri(&dbo("Organisation"))
        .primary_key(&["id"])
        .column("id", Integer)
        .stored("nome", Text)
        .column("id_esfera_administrativa", Integer)
        .column("id_municipio", Integer)
        .stored("endereco", Text)
        .stored("cep", Text)
        .stored("telefone", Text)
        .stored("fax", Text)
        .stored("nome_responsavel", Text)
        .column("id_responsavel", Text)
        .stored("inscricao_estadual", Text)
        .stored("inscricao_municipal", Text)
        .column("id_natureza_juridica", Integer)
        .reference("pessoa_responsavel", "PessoaResponsavel", "id_responsavel", "id")
        .reference("municipio", "Municipio", "id_municipio", "id")
        .reference("natureza_juridica", "NaturezaJuridica", "id_natureza_juridica", "id")
        .reference("esfera_administrativa", "EsferaAdministrativa", "id_esfera_administrativa", "id")
        .computed("cnpj", FieldKind::Scalar(Text), |r| {
            r.column_i64("id")
                .map(|id| Value::Text(format_cnpj(id)))
                .unwrap_or(Value::Null)
        })
        .computed("cpf_responsavel", FieldKind::Scalar(Text), |r| {
            related_column(r, "pessoa_responsavel", "cpf")
        })
        .computed("href_propostas", FieldKind::Link, |r| {
            r.list_link("propostas", "id_proponente", "id")
        })
        .computed("href_convenios", FieldKind::Link, |r| {
            r.list_link("convenios", "id_proponente", "id")
        })
        .exposed(&[
            "cnpj",
            "nome",
            "esfera_administrativa",
            "municipio",
            "endereco",
            "cep",
            "pessoa_responsavel",
            "nome_responsavel",
            "cpf_responsavel",
            "telefone",
            "fax",
            "natureza_juridica",
            "inscricao_estadual",
            "inscricao_municipal",
            "href_propostas",
            "href_convenios",
        ])
        .preload(&["municipio", "natureza_juridica", "esfera_administrativa"])
        .rdf_relationship("municipio", &dbo("location"))
        .build()
}

fn situacao_proposta() -> Result<EntityDescriptor, CatalogError> {
    EntityDescriptor::builder("SituacaoProposta", "situacao_proposta")
        .resource("situacao_proposta", "situacoes_propostas")
        .primary_key(&["id"])
        .column("id", Integer)
        .stored("nome", Text)
        .computed("href_propostas", FieldKind::Link, |r| {
            r.list_link("propostas", "id_situacao", "id")
        })
        .exposed(&["nome", "href_propostas"])
        .build()
}

fn situacao_convenio() -> Result<EntityDescriptor, CatalogError> {
    EntityDescriptor::builder("SituacaoConvenio", "situacao_convenio")
        .resource("situacao_convenio", "situacoes_convenios")
        .primary_key(&["id"])
        .column("id", Integer)
        .stored("nome", Text)
        .computed("href_convenios", FieldKind::Link, |r| {
            r.list_link("convenios", "id_situacao", "id")
        })
        .exposed(&["nome", "href_convenios"])
        .build()
}

fn subsituacao_convenio() -> Result<EntityDescriptor, CatalogError> {
    EntityDescriptor::builder("SubsituacaoConvenio", "subsituacao_convenio")
        .resource("subsituacao_convenio", "subsituacoes_convenios")
        .primary_key(&["id"])
        .column("id", Integer)
        .stored("nome", Text)
        .exposed(&["nome"])
        .build()
}

fn situacao_publicacao_convenio() -> Result<EntityDescriptor, CatalogError> {
    EntityDescriptor::builder("SituacaoPublicacaoConvenio", "situacao_publicacao_convenio")
        .resource("situacao_publicacao_convenio", "situacoes_publicacao_convenio")
        .primary_key(&["id"])
        .column("id", Integer)
        .stored("nome", Text)
        .exposed(&["nome"])
        .build()
}

fn modalidade() -> Result<EntityDescriptor, CatalogError> {
    EntityDescriptor::builder("Modalidade", "modalidade_proposta")
        .resource("modalidade", "modalidades")
        .primary_key(&["id"])
        .column("id", Integer)
        .stored("nome", Text)
        .computed("href_propostas", FieldKind::Link, |r| {
            r.list_link("propostas", "id_modalidade", "id")
        })
        .computed("href_convenios", FieldKind::Link, |r| {
            r.list_link("convenios", "id_modalidade", "id")
        })
        .exposed(&["nome", "href_propostas", "href_convenios"])
        .build()
}

fn orgao() -> Result<EntityDescriptor, CatalogError> {
    EntityDescriptor::builder("Orgao", "orgao")
        .resource("orgao", "orgaos")
        .class_uri(GOVERNMENTAL_ORGANIZATION)
        .primary_key(&["id"])
        .stored("id", Integer)
        .stored("nome", Text)
        .column("id_orgao_superior", Integer)
        .reference("orgao_superior", "Orgao", "id_orgao_superior", "id")
        .collection("orgaos_subordinados", "Orgao", "id", "id_orgao_superior")
        .alias("cod_siasg", "id")
        .computed("href_propostas_como_concedente", FieldKind::Link, |r| {
            r.list_link("propostas", "id_orgao_concedente", "id")
        })
        .computed("href_convenios_como_concedente", FieldKind::Link, |r| {
            r.list_link("convenios", "id_orgao_concedente", "id")
        })
        .computed("href_programas_como_superior", FieldKind::Link, |r| {
            r.list_link("programas", "id_orgao_superior", "id")
        })
        .computed("href_programas_como_vinculado", FieldKind::Link, |r| {
            r.list_link("programas", "id_orgao_vinculado", "id")
        })
        .computed("href_programas_como_mandatario", FieldKind::Link, |r| {
            r.list_link("programas", "id_orgao_mandatario", "id")
        })
        .computed("href_programas_como_executor", FieldKind::Link, |r| {
            r.list_link("programas", "id_orgao_executor", "id")
        })
        .exposed(&[
            "id",
            "nome",
            "orgao_superior",
            "cod_siasg",
            "orgaos_subordinados",
            "href_propostas_como_concedente",
            "href_convenios_como_concedente",
            "href_programas_como_superior",
            "href_programas_como_vinculado",
            "href_programas_como_mandatario",
            "href_programas_como_executor",
        ])
        .summary(&["id", "nome", "orgao_superior", "cod_siasg"])
        .preload(&["orgao_superior"])
        .rdf_relationship("orgao_superior", &dbo("parentOrganisation"))
        .build()
}

fn programa() -> Result<EntityDescriptor, CatalogError> {
    EntityDescriptor::builder("Programa", "programa")
        .resource("programa", "programas")
        .primary_key(&["id"])
        .stored("id", Integer)
        .stored("cod_programa_siconv", Text)
        .stored("nome", Text)
        .stored("descricao", Text)
        .stored("data_disponibilizacao", Date)
        .stored("data_inicio_recebimento_propostas", Date)
        .stored("data_fim_recebimento_propostas", Date)
        .stored("acao_orcamentaria", Text)
        .stored("obriga_plano_trabalho", Boolean)
        .stored("aceita_emenda_parlamentar", Boolean)
        .stored("data_inicio_emenda_parlamentar", Date)
        .stored("data_fim_emenda_parlamentar", Date)
        .stored("data_inicio_beneficiario_especifico", Date)
        .stored("data_fim_beneficiario_especifico", Date)
        .stored("data_publicacao_dou", Date)
        .stored("situacao", Text)
        .column("id_orgao_superior", Integer)
        .column("id_orgao_vinculado", Integer)
        .column("id_orgao_mandatario", Integer)
        .column("id_orgao_executor", Integer)
        .reference("orgao_superior", "Orgao", "id_orgao_superior", "id")
        .reference("orgao_vinculado", "Orgao", "id_orgao_vinculado", "id")
        .reference("orgao_mandatario", "Orgao", "id_orgao_mandatario", "id")
        .reference("orgao_executor", "Orgao", "id_orgao_executor", "id")
        .association(
            "atende_a",
            "NaturezaJuridica",
            "id",
            "id",
            Association {
                table: "programa_atende_a".to_string(),
                local_column: "id_programa".to_string(),
                remote_column: "id_natureza_juridica".to_string(),
            },
        )
        .association(
            "estados_habilitados",
            "UnidadeFederativa",
            "id",
            "sigla",
            Association {
                table: "uf_programa".to_string(),
                local_column: "id_programa".to_string(),
                remote_column: "sigla_uf".to_string(),
            },
        )
        .computed("ufs_habilitadas", FieldKind::List, |r| {
            let mut siglas: Vec<String> = match r.related("estados_habilitados") {
                Some(Value::List(items)) => items
                    .iter()
                    .filter_map(|v| match v {
                        Value::Entity(uf) => uf.column_text("sigla"),
                        _ => None,
                    })
                    .collect(),
                _ => Vec::new(),
            };
            siglas.sort();
            Value::List(siglas.into_iter().map(Value::Text).collect())
        })
        .computed("href_emendas", FieldKind::Link, |r| {
            r.list_link("emendas", "id_programa", "id")
        })
        .computed("href_propostas", FieldKind::Link, |r| {
            r.list_link("propostas", "id_programa", "id")
        })
        .computed("href_convenios", FieldKind::Link, |r| {
            r.list_link("convenios", "id_programa", "id")
        })
        .exposed(&[
            "id",
            "cod_programa_siconv",
            "nome",
            "descricao",
            "data_disponibilizacao",
            "data_inicio_recebimento_propostas",
            "data_fim_recebimento_propostas",
            "acao_orcamentaria",
            "obriga_plano_trabalho",
            "aceita_emenda_parlamentar",
            "data_inicio_emenda_parlamentar",
            "data_fim_emenda_parlamentar",
            "data_inicio_beneficiario_especifico",
            "data_fim_beneficiario_especifico",
            "data_publicacao_dou",
            "situacao",
            "orgao_superior",
            "orgao_mandatario",
            "orgao_vinculado",
            "orgao_executor",
            "ufs_habilitadas",
            "atende_a",
            "href_emendas",
            "href_propostas",
            "href_convenios",
        ])
        .preload(&[
            "atende_a",
            "orgao_superior",
            "orgao_mandatario",
            "orgao_vinculado",
            "orgao_executor",
            "estados_habilitados",
        ])
        .build()
}

fn proposta_programa() -> Result<EntityDescriptor, CatalogError> {
    EntityDescriptor::builder("PropostaPrograma", "proposta_programa")
        .resource("proposta_programa", "proposta_programa")
        .primary_key(&["id_proposta", "id_programa"])
        .column("id_proposta", Integer)
        .column("id_programa", Integer)
        .column("valor_global", Decimal)
        .column("valor_repasse", Decimal)
        .column("valor_contrapartida", Decimal)
        .column("valor_contrapartida_financeira", Decimal)
        .column("valor_contrapartida_bens", Decimal)
        .reference("proposta", "Proposta", "id_proposta", "id")
        .reference("programa", "Programa", "id_programa", "id")
        .computed("valores", FieldKind::Map, |r| valores(r, "contrapartida_bens_servicos"))
        .exposed(&["proposta", "programa", "valores"])
        .build()
}

fn convenio_programa() -> Result<EntityDescriptor, CatalogError> {
    EntityDescriptor::builder("ConvenioPrograma", "convenio_programa")
        .resource("convenio_programa", "convenio_programa")
        .primary_key(&["id_convenio", "id_programa"])
        .column("id_convenio", Integer)
        .column("id_programa", Integer)
        .column("valor_global", Decimal)
        .column("valor_repasse", Decimal)
        .column("valor_contrapartida", Decimal)
        .column("valor_contrapartida_financeira", Decimal)
        .column("valor_contrapartida_bens", Decimal)
        .reference("convenio", "Convenio", "id_convenio", "id")
        .reference("programa", "Programa", "id_programa", "id")
        .computed("valores", FieldKind::Map, |r| valores(r, "contrapartida_bens"))
        .exposed(&["convenio", "programa", "valores"])
        .build()
}

fn proposta() -> Result<EntityDescriptor, CatalogError> {
    EntityDescriptor::builder("Proposta", "proposta")
        .resource("proposta", "propostas")
        .primary_key(&["id"])
        .stored("id", Integer)
        .column("sequencial", Integer)
        .column("ano", Integer)
        .stored("inicio_execucao", Date)
        .stored("fim_execucao", Date)
        .stored("justificativa", Text)
        .stored("objeto", Text)
        .stored("capacidade_tecnica", Text)
        .stored("valor_global", Decimal)
        .stored("valor_repasse", Decimal)
        .stored("valor_contra_partida", Decimal)
        .stored("valor_contrapartida_financeira", Decimal)
        .stored("valor_contrapartida_bens_servicos", Decimal)
        .stored("data_envio_proposta", Date)
        .stored("data_cadastramento_proposta", Date)
        .column("id_situacao", Integer)
        .stored("agencia_bancaria", Text)
        .stored("conta_bancaria", Text)
        .stored("nome_banco", Text)
        .stored("codigo_banco", Integer)
        .stored("indicador_parecer_tecnico", Boolean)
        .stored("indicador_parecer_juridico", Boolean)
        .stored("indicador_parecer_gestor", Boolean)
        .stored("numero_processo", Text)
        .column("id_proponente", Integer)
        .column("id_orgao_concedente", Integer)
        .column("id_modalidade", Integer)
        .column("id_pessoa_responsavel_pelo_concedente", Text)
        .column("id_pessoa_responsavel_pelo_cadastramento", Text)
        .column("id_pessoa_responsavel_pelo_envio", Text)
        .reference("situacao", "SituacaoProposta", "id_situacao", "id")
        .reference("modalidade", "Modalidade", "id_modalidade", "id")
        .reference("convenio", "Convenio", "id", "id_proposta")
        .reference("proponente", "Proponente", "id_proponente", "id")
        .reference("orgao_concedente", "Orgao", "id_orgao_concedente", "id")
        .reference(
            "pessoa_responsavel_pelo_concedente",
            "PessoaResponsavel",
            "id_pessoa_responsavel_pelo_concedente",
            "id",
        )
        .reference(
            "pessoa_responsavel_pelo_cadastramento",
            "PessoaResponsavel",
            "id_pessoa_responsavel_pelo_cadastramento",
            "id",
        )
        .reference(
            "pessoa_responsavel_pelo_envio",
            "PessoaResponsavel",
            "id_pessoa_responsavel_pelo_envio",
            "id",
        )
        .collection("_programas", "PropostaPrograma", "id", "id_proposta")
        .association(
            "programas",
            "Programa",
            "id",
            "id",
            Association {
                table: "proposta_programa".to_string(),
                local_column: "id_proposta".to_string(),
                remote_column: "id_programa".to_string(),
            },
        )
        .computed("numero_proposta", FieldKind::Scalar(Text), |r| {
            match (r.column_i64("sequencial"), r.column_i64("ano")) {
                (Some(seq), Some(ano)) => Value::Text(format!("{}/{}", seq, ano)),
                _ => Value::Null,
            }
        })
        .computed("justificativa_resumida", FieldKind::Scalar(Text), |r| {
            summarized(r, "justificativa")
        })
        .computed("objeto_resumido", FieldKind::Scalar(Text), |r| summarized(r, "objeto"))
        .exposed(&[
            "numero_proposta",
            "id",
            "convenio",
            "modalidade",
            "orgao_concedente",
            "inicio_execucao",
            "fim_execucao",
            "justificativa",
            "justificativa_resumida",
            "objeto",
            "objeto_resumido",
            "valor_global",
            "valor_repasse",
            "valor_contra_partida",
            "data_envio_proposta",
            "data_cadastramento_proposta",
            "situacao",
            "proponente",
            "programas",
            "pessoa_responsavel_pelo_concedente",
            "pessoa_responsavel_pelo_cadastramento",
            "pessoa_responsavel_pelo_envio",
        ])
        .summary(&[
            "id",
            "inicio_execucao",
            "fim_execucao",
            "justificativa_resumida",
            "objeto_resumido",
            "valor_global",
            "valor_repasse",
            "valor_contra_partida",
            "data_envio_proposta",
            "data_cadastramento_proposta",
            "situacao",
            "proponente",
        ])
        .preload(&["proponente", "situacao"])
        .rdf_relationship("proponente", &dbo("applicant"))
        .build()
}

fn convenio() -> Result<EntityDescriptor, CatalogError> {
    EntityDescriptor::builder("Convenio", "convenio")
        .resource("convenio", "convenios")
        .primary_key(&["id"])
        .stored("id", Integer)
        .stored("data_inicio_vigencia", Date)
        .stored("data_fim_vigencia", Date)
        .stored("justificativa", Text)
        .stored("objeto", Text)
        .stored("capacidade_tecnica", Text)
        .stored("valor_global", Decimal)
        .stored("valor_repasse", Decimal)
        .stored("valor_contra_partida", Decimal)
        .stored("valor_contrapartida_financeira", Decimal)
        .stored("valor_contrapartida_bens_servicos", Decimal)
        .stored("data_assinatura", Date)
        .stored("data_publicacao", Date)
        .column("id_situacao", Integer)
        .column("id_subsituacao", Integer)
        .column("id_situacao_publicacao", Integer)
        .stored("agencia_bancaria", Text)
        .stored("conta_bancaria", Text)
        .stored("nome_banco", Text)
        .stored("codigo_banco", Integer)
        .stored("indicador_parecer_tecnico", Boolean)
        .stored("indicador_parecer_juridico", Boolean)
        .stored("indicador_parecer_gestor", Boolean)
        .stored("indicador_publicado", Boolean)
        .stored("numero_processo", Text)
        .stored("numero_interno", Text)
        .stored("permite_ajustes_cronograma_fisico", Boolean)
        .stored("indicador_termo_aditivo", Boolean)
        .column("id_proposta", Integer)
        .column("id_proponente", Integer)
        .column("id_orgao_concedente", Integer)
        .column("id_modalidade", Integer)
        .column("id_pessoa_responsavel_como_concedente", Text)
        .reference("situacao", "SituacaoConvenio", "id_situacao", "id")
        .reference("subsituacao", "SubsituacaoConvenio", "id_subsituacao", "id")
        .reference(
            "situacao_publicacao",
            "SituacaoPublicacaoConvenio",
            "id_situacao_publicacao",
            "id",
        )
        .reference("modalidade", "Modalidade", "id_modalidade", "id")
        .reference("proposta", "Proposta", "id_proposta", "id")
        .reference("proponente", "Proponente", "id_proponente", "id")
        .reference("orgao_concedente", "Orgao", "id_orgao_concedente", "id")
        .reference(
            "pessoa_responsavel_como_concedente",
            "PessoaResponsavel",
            "id_pessoa_responsavel_como_concedente",
            "id",
        )
        .collection("_programas", "ConvenioPrograma", "id", "id_convenio")
        .association(
            "programas",
            "Programa",
            "id",
            "id",
            Association {
                table: "convenio_programa".to_string(),
                local_column: "id_convenio".to_string(),
                remote_column: "id_programa".to_string(),
            },
        )
        .computed("cpf_pessoa_responsavel_como_concedente", FieldKind::Scalar(Text), |r| {
            related_column(r, "pessoa_responsavel_como_concedente", "cpf")
        })
        .computed("justificativa_resumida", FieldKind::Scalar(Text), |r| {
            summarized(r, "justificativa")
        })
        .computed("objeto_resumido", FieldKind::Scalar(Text), |r| summarized(r, "objeto"))
        .computed("href_ordens_bancarias", FieldKind::Link, |r| {
            r.list_link("ordens_bancarias", "id_convenio", "id")
        })
        .exposed(&[
            "id",
            "modalidade",
            "proposta",
            "orgao_concedente",
            "pessoa_responsavel_como_concedente",
            "cpf_pessoa_responsavel_como_concedente",
            "justificativa",
            "justificativa_resumida",
            "objeto",
            "objeto_resumido",
            "capacidade_tecnica",
            "data_inicio_vigencia",
            "data_fim_vigencia",
            "valor_global",
            "valor_repasse",
            "valor_contra_partida",
            "valor_contrapartida_financeira",
            "valor_contrapartida_bens_servicos",
            "agencia_bancaria",
            "conta_bancaria",
            "codigo_banco",
            "nome_banco",
            "indicador_parecer_tecnico",
            "indicador_parecer_juridico",
            "indicador_parecer_gestor",
            "indicador_publicado",
            "numero_processo",
            "numero_interno",
            "permite_ajustes_cronograma_fisico",
            "indicador_termo_aditivo",
            "data_assinatura",
            "data_publicacao",
            "situacao",
            "subsituacao",
            "situacao_publicacao",
            "proponente",
            "programas",
            "href_ordens_bancarias",
        ])
        .summary(&[
            "id",
            "modalidade",
            "orgao_concedente",
            "justificativa_resumida",
            "objeto_resumido",
            "data_inicio_vigencia",
            "data_fim_vigencia",
            "valor_global",
            "valor_repasse",
            "valor_contra_partida",
            "data_assinatura",
            "data_publicacao",
            "situacao",
            "proponente",
        ])
        .preload(&["proponente", "modalidade", "situacao", "orgao_concedente"])
        .rdf_relationship("proponente", &dbo("applicant"))
        .build()
}

fn emenda() -> Result<EntityDescriptor, CatalogError> {
    EntityDescriptor::builder("Emenda", "emenda")
        .resource("emenda", "emendas")
        .primary_key(&["id_programa", "numero", "id_programa_qualificacao"])
        .column("id_programa", Integer)
        .stored("numero", Integer)
        .stored("id_programa_qualificacao", Integer)
        .stored("valor", Decimal)
        .reference("programa", "Programa", "id_programa", "id")
        .computed("id", FieldKind::Scalar(Text), |r| Value::Text(r.id()))
        .exposed(&["id", "programa", "id_programa_qualificacao", "numero", "valor"])
        .build()
}

fn ordem_bancaria() -> Result<EntityDescriptor, CatalogError> {
    EntityDescriptor::builder("OrdemBancaria", "ordem_bancaria")
        .resource("ordem_bancaria", "ordens_bancarias")
        .primary_key(&["id"])
        .stored("id", Integer)
        .stored("numero", Text)
        .stored("id_unidade_emitente", Integer)
        .column("id_convenio", Integer)
        .stored("numero_documento_habil_siafi", Text)
        .stored("numero_interno_concedente", Text)
        .stored("cod_gestao_emitente", Integer)
        .stored("cod_gestao_favorecida", Integer)
        .stored("observacao", Text)
        .stored("data_ateste", Date)
        .stored("situacao", Text)
        .stored("justificativa_inadimplencia", Text)
        .stored("valor", Decimal)
        .stored("data", Date)
        .reference("convenio", "Convenio", "id_convenio", "id")
        .exposed(&[
            "id",
            "numero",
            "id_unidade_emitente",
            "convenio",
            "data",
            "data_ateste",
            "valor",
            "observacao",
            "numero_documento_habil_siafi",
            "numero_interno_concedente",
            "cod_gestao_emitente",
            "cod_gestao_favorecida",
            "situacao",
            "justificativa_inadimplencia",
        ])
        .summary(&[
            "id",
            "numero",
            "id_unidade_emitente",
            "convenio",
            "data",
            "data_ateste",
            "valor",
            "observacao",
            "numero_documento_habil_siafi",
        ])
        .label("numero")
        .build()
}

fn especie_empenho() -> Result<EntityDescriptor, CatalogError> {
    EntityDescriptor::builder("EspecieEmpenho", "especie_empenho")
        .resource("especie_empenho", "especies_empenho")
        .primary_key(&["id"])
        .stored("id", Integer)
        .stored("descricao", Text)
        .computed("href_empenhos", FieldKind::Link, |r| {
            r.list_link("empenhos", "id_especie", "id")
        })
        .exposed(&["id", "descricao", "href_empenhos"])
        .build()
}

fn empenho() -> Result<EntityDescriptor, CatalogError> {
    EntityDescriptor::builder("Empenho", "empenho")
        .resource("empenho", "empenhos")
        .primary_key(&["id"])
        .stored("id", Integer)
        // alphanumeric qualifiers
        .stored("numero", Text)
        .stored("numero_minuta", Text)
        .column("id_convenio", Integer)
        .column("id_especie", Integer)
        .column("id_proponente_favorecido", Integer)
        .stored("cod_unidade_gestora_emitente", Integer)
        .stored("cod_unidade_gestora_referencia", Integer)
        .stored("cod_unidade_gestora_responsavel", Integer)
        .stored("cod_gestao_emitente", Integer)
        .stored("cod_gestao_referencia", Integer)
        .stored("cod_fonte_recurso", Integer)
        .stored("tipo_empenho", Text)
        .stored("numero_plano_trabalho_resumido", Integer)
        .stored("numero_plano_interno", Text)
        .stored("esfera_orcamentaria", Text)
        .stored("data_emissao", Date)
        .stored("numero_interno_concedente", Text)
        .stored("numero_interno_concedente_referencia", Text)
        .stored("observacao", Text)
        .stored("situacao", Text)
        .stored("numero_lista", Text)
        .stored("numero_programa_trabalho", Integer)
        .stored("cod_unidade_orcamentaria", Integer)
        .column("numero_natureza_despesa_subitem", Text)
        .column("descricao_natureza_despesa_subitem", Text)
        .stored("valor", Decimal)
        .stored("numero_empenho_referencia", Text)
        .reference("convenio", "Convenio", "id_convenio", "id")
        .reference("especie", "EspecieEmpenho", "id_especie", "id")
        .reference("proponente_favorecido", "Proponente", "id_proponente_favorecido", "id")
        .computed("natureza_despesa_subitem", FieldKind::Map, |r| {
            Value::Map(vec![
                ("numero".to_string(), r.column("numero_natureza_despesa_subitem")),
                ("descricao".to_string(), r.column("descricao_natureza_despesa_subitem")),
            ])
        })
        .exposed(&[
            "id",
            "numero",
            "especie",
            "convenio",
            "proponente_favorecido",
            "cod_unidade_gestora_emitente",
            "cod_unidade_gestora_referencia",
            "cod_unidade_gestora_responsavel",
            "cod_gestao_emitente",
            "cod_gestao_referencia",
            "cod_fonte_recurso",
            "tipo_empenho",
            "numero_plano_trabalho_resumido",
            "numero_plano_interno",
            "esfera_orcamentaria",
            "data_emissao",
            "numero_interno_concedente",
            "numero_interno_concedente_referencia",
            "observacao",
            "situacao",
            "numero_lista",
            "numero_programa_trabalho",
            "cod_unidade_orcamentaria",
            "natureza_despesa_subitem",
            "valor",
            "numero_empenho_referencia",
        ])
        .label("numero")
        .build()
}

fn area_atuacao_proponente() -> Result<EntityDescriptor, CatalogError> {
    EntityDescriptor::builder("AreaAtuacaoProponente", "area_atuacao_proponente")
        .resource("area_atuacao_proponente", "areas_atuacao_proponente")
        .primary_key(&["id"])
        .stored("id", Integer)
        .stored("descricao", Text)
        .computed("href_subareas", FieldKind::Link, |r| {
            r.list_link("subareas_atuacao_proponente", "id_area", "id")
        })
        .exposed(&["id", "descricao", "href_subareas"])
        .build()
}

fn subarea_atuacao_proponente() -> Result<EntityDescriptor, CatalogError> {
    EntityDescriptor::builder("SubAreaAtuacaoProponente", "subarea_atuacao_proponente")
        .resource("subarea_atuacao_proponente", "subareas_atuacao_proponente")
        .element_name("subarea_atuacao_proponente")
        .primary_key(&["id"])
        .stored("id", Integer)
        .column("id_area", Integer)
        .stored("descricao", Text)
        .reference("area", "AreaAtuacaoProponente", "id_area", "id")
        .computed("href_habilitacoes", FieldKind::Link, |r| {
            r.list_link("habilitacoes_area_atuacao", "id_subarea", "id")
        })
        .exposed(&["id", "area", "descricao", "href_habilitacoes"])
        .build()
}

fn habilitacao_area_atuacao() -> Result<EntityDescriptor, CatalogError> {
    EntityDescriptor::builder("HabilitacaoAreaAtuacao", "habilitacao_area_atuacao")
        .resource("habilitacao_area_atuacao", "habilitacoes_area_atuacao")
        .primary_key(&["id"])
        .stored("id", Integer)
        .column("id_subarea", Integer)
        .column("id_proponente", Integer)
        .column("id_orgao", Integer)
        .column("id_pessoa_responsavel", Text)
        .stored("situacao", Text)
        .stored("data_inicio", Date)
        .stored("data_vencimento", Date)
        .reference("subarea", "SubAreaAtuacaoProponente", "id_subarea", "id")
        .reference("proponente", "Proponente", "id_proponente", "id")
        .reference("orgao", "Orgao", "id_orgao", "id")
        .reference("pessoa_responsavel", "PessoaResponsavel", "id_pessoa_responsavel", "id")
        .computed("cpf_responsavel", FieldKind::Scalar(Text), |r| {
            related_column(r, "pessoa_responsavel", "cpf")
        })
        .exposed(&[
            "id",
            "subarea",
            "proponente",
            "orgao",
            "pessoa_responsavel",
            "cpf_responsavel",
            "situacao",
            "data_inicio",
            "data_vencimento",
        ])
        .build()
}

pub fn descriptors() -> Result<Vec<EntityDescriptor>, CatalogError> {
    Ok(vec![
        municipio()?,
        unidade_federativa()?,
        esfera_administrativa()?,
        natureza_juridica()?,
        pessoa_responsavel()?,
        proponente()?,
        situacao_proposta()?,
        situacao_convenio()?,
        subsituacao_convenio()?,
        situacao_publicacao_convenio()?,
        modalidade()?,
        orgao()?,
        programa()?,
        proposta_programa()?,
        convenio_programa()?,
        proposta()?,
        convenio()?,
        emenda()?,
        ordem_bancaria()?,
        especie_empenho()?,
        empenho()?,
        area_atuacao_proponente()?,
        subarea_atuacao_proponente()?,
        habilitacao_area_atuacao()?,
    ])
}

pub fn catalog() -> Result<Catalog, CatalogError> {
    Catalog::from_descriptors(descriptors()?)
}
